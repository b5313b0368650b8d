use informe::xml_tree::{decode_text, parse_amount, RawDocument};
use rust_decimal::Decimal;

const NS: &str = "urn:test";

#[test]
fn parse_amount_accepts_dot_and_comma_notation() {
    assert_eq!(parse_amount("1234.56"), Some(Decimal::new(123456, 2)));
    assert_eq!(parse_amount("1234,56"), Some(Decimal::new(123456, 2)));
    assert_eq!(parse_amount("1.234,56"), Some(Decimal::new(123456, 2)));
    assert_eq!(parse_amount(" 0 "), Some(Decimal::ZERO));
}

#[test]
fn parse_amount_uses_last_separator_as_decimal() {
    assert_eq!(parse_amount("1,234.56"), Some(Decimal::new(123456, 2)));
    assert_eq!(parse_amount("1.234.567,89"), Some(Decimal::new(123456789, 2)));
    assert_eq!(parse_amount("1,234,567.89"), Some(Decimal::new(123456789, 2)));
    assert_eq!(parse_amount("1.234.567"), Some(Decimal::new(1234567, 0)));
}

#[test]
fn parse_amount_rejects_blank_and_garbage() {
    assert_eq!(parse_amount(""), None);
    assert_eq!(parse_amount("   "), None);
    assert_eq!(parse_amount("R$ 10"), None);
}

#[test]
fn parse_amount_rounds_to_cents() {
    assert_eq!(parse_amount("10.005"), Some(Decimal::new(1000, 2)));
    assert_eq!(parse_amount("10.015"), Some(Decimal::new(1002, 2)));
}

#[test]
fn decode_text_strips_bom_and_falls_back_to_latin1() {
    assert_eq!(decode_text(b"\xEF\xBB\xBF<a/>"), "<a/>");
    assert_eq!(decode_text(b"<a>S\xE3o Paulo</a>"), "<a>São Paulo</a>");
}

#[test]
fn parses_latin1_bytes_into_elements() {
    let doc = RawDocument::parse_bytes(b"<r xmlns=\"urn:test\"><nome>JO\xC3O</nome></r>")
        .expect("latin1 document should parse");
    let root = doc.scoped(NS, doc.root().unwrap());
    assert_eq!(root.field("nome"), Some("JO\u{c3}O"));
}

#[test]
fn element_ref_navigates_children_and_descendants() {
    let xml = r#"<root xmlns="urn:test">
        <a><v>1</v></a>
        <a><v>2</v><b><v>3</v></b></a>
        <other xmlns="urn:other"><v>9</v></other>
    </root>"#;
    let doc = RawDocument::parse_str(xml).unwrap();
    let root = doc.scoped(NS, doc.root().unwrap());

    assert_eq!(root.children("a").count(), 2);
    assert_eq!(root.child("a").and_then(|a| a.field("v")), Some("1"));
    assert_eq!(root.find("b").and_then(|b| b.field("v")), Some("3"));

    let values: Vec<&str> = root.find_all("v").iter().map(|v| v.text()).collect();
    assert_eq!(values, vec!["1", "2", "3"]);
    assert!(root.child("other").is_none());
}

#[test]
fn missing_leaves_default_instead_of_failing() {
    let doc = RawDocument::parse_str(r#"<r xmlns="urn:test"><valor>abc</valor></r>"#).unwrap();
    let root = doc.scoped(NS, doc.root().unwrap());

    assert_eq!(root.field("absent"), None);
    assert_eq!(root.string("absent"), "");
    assert_eq!(root.amount("absent"), Decimal::ZERO);
    assert_eq!(root.amount("valor"), Decimal::ZERO);
}

#[test]
fn element_records_namespace_and_expanded_name() {
    let doc = RawDocument::parse_str(r#"<p:r xmlns:p="urn:test"><plain/></p:r>"#).unwrap();
    let root = doc.element(doc.root().unwrap());
    assert_eq!(root.local_name, "r");
    assert_eq!(root.expanded_name(), "{urn:test}r");

    let (_, plain) = doc.iter().nth(1).unwrap();
    assert_eq!(plain.namespace, None);
    assert_eq!(plain.expanded_name(), "plain");
}

#[test]
fn malformed_xml_is_an_error() {
    assert!(RawDocument::parse_str("<a><b></a>").is_err());
}
