use domain::{StructDescriptor, StructValue, Value, ValueKind, compose_iqname, compose_qname};

#[test]
fn qname_joins_non_empty_segments_in_order() {
    assert_eq!(compose_qname("/", &["machine", "", "axis", "speed"]), "machine/axis/speed");
    assert_eq!(compose_qname(".", &[]), "");
    assert_eq!(compose_qname(".", &["", ""]), "");
}

#[test]
fn qname_is_associative() {
    let left = compose_qname("/", &[&compose_qname("/", &["a", "b"]), "c"]);
    let right = compose_qname("/", &["a", &compose_qname("/", &["b", "c"])]);
    assert_eq!(left, right);
}

#[test]
fn iqname_prefixes_only_non_empty_names() {
    assert_eq!(compose_iqname("Objects", "/", &["pump", "flow"]), "Objects/pump/flow");
    assert_eq!(compose_iqname("Objects", "/", &["", ""]), "");
    assert_eq!(compose_iqname("", "/", &["pump"]), "pump");
}

#[test]
fn display_matches_textual_form() {
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::Float(17.25).to_string(), "17.25");
    assert_eq!(Value::from(vec![Value::Int(1), Value::Int(2)]).to_string(), "[1, 2]");

    let point = StructValue::new("Point").with_field("x", 1).with_field("y", "up");
    assert_eq!(Value::Struct(point).to_string(), "Point{x=1, y=up}");
}

#[test]
fn exact_try_from_rejects_other_kinds() {
    assert_eq!(i32::try_from(Value::Int(7)), Ok(7));
    assert_eq!(i64::try_from(Value::Int(7)), Err(Value::Int(7)));
    assert_eq!(f64::try_from(Value::Float(1.0)), Err(Value::Float(1.0)));
    assert_eq!(String::try_from(Value::from("x")), Ok("x".to_string()));
    assert_eq!(Value::Short(1).kind(), ValueKind::Short);
}

#[test]
fn descriptor_validates_fields() {
    let descriptor = StructDescriptor::new("Point")
        .with_field("x", ValueKind::Int)
        .with_field("y", ValueKind::Int);

    let ok = StructValue::new("Point").with_field("x", 1).with_field("y", 2);
    assert!(descriptor.validate(&ok).is_ok());

    let wrong_kind = StructValue::new("Point").with_field("x", 1).with_field("y", "2");
    assert!(descriptor.validate(&wrong_kind).is_err());

    let missing = StructValue::new("Point").with_field("x", 1);
    assert!(descriptor.validate(&missing).is_err());

    let other_type = StructValue::new("Vector").with_field("x", 1).with_field("y", 2);
    assert!(descriptor.validate(&other_type).is_err());
}
