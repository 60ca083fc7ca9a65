//! Normalized output serialized back to HTML is a fixed point.

use html::{Normalizer, ParserConfig};
use html_test_support::serialize::normalize_to_html;

fn round(input: &str) -> String {
    normalize_to_html(&mut Normalizer::from_str(input, ParserConfig::default()))
}

fn assert_fixed_point(input: &str, expected: &str) {
    let once = round(input);
    assert_eq!(once, expected, "first pass of {input:?}");
    let twice = round(&once);
    assert_eq!(twice, once, "second pass of {input:?}");
}

#[test]
fn overlap_is_written_as_split_elements() {
    assert_fixed_point("<b>A<div>B</b>C</div>", "<b>A<div>B</div></b><div>C</div>");
}

#[test]
fn synthesized_containers_are_stable() {
    assert_fixed_point(
        "<td>x",
        "<table><tbody><tr><td>x</td></tr></tbody></table>",
    );
    assert_fixed_point("<li>a<li>b", "<ul><li>a</li><li>b</li></ul>");
    assert_fixed_point("<p>one<p>two", "<p>one</p><p>two</p>");
    assert_fixed_point(
        "<select><option>a<option>b<select>c",
        "<select><option>a</option><option>b</option></select>c",
    );
}

#[test]
fn collapsed_whitespace_is_stable() {
    assert_fixed_point("x <b>y</b>  z", "x <b>y</b> z");
}

#[test]
fn text_and_attributes_are_escaped() {
    assert_fixed_point("a &amp; b &lt;c&gt;", "a &amp; b &lt;c&gt;");
    assert_fixed_point(
        "<a href='x\"y'>1<a>2",
        "<a href=\"x&quot;y\">1</a><a>2</a>",
    );
}

#[test]
fn raw_text_is_written_verbatim() {
    assert_fixed_point(
        "<script>if (a<b) x</script>",
        "<script>if (a<b) x</script>",
    );
}

#[test]
fn document_skeleton_is_stable() {
    let doc = "<!DOCTYPE html><html><head><title>T</title></head><body>x</body></html>";
    assert_fixed_point(doc, doc);
}
