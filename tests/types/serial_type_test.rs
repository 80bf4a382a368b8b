use litescan::types::{
    error::{DatabaseError, ErrorKind},
    serial_type::{SerialType, serial_type_size},
    value::Value,
};

#[test]
fn test_serial_type_sizes() -> Result<(), DatabaseError> {
    let expected = [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (5, 6), (6, 8), (7, 8), (8, 0), (9, 0)];
    for (code, size) in expected {
        assert_eq!(serial_type_size(code)?, size, "serial type {code}");
    }
    assert_eq!(serial_type_size(12)?, 0);
    assert_eq!(serial_type_size(13)?, 0);
    assert_eq!(serial_type_size(18)?, 3);
    assert_eq!(serial_type_size(19)?, 3);
    Ok(())
}

#[test]
fn test_reserved_serial_types_are_rejected() {
    for code in [10, 11] {
        let err = SerialType::from_code(code).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidSerialType(c) if c == code));
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}

#[test]
fn test_integers_are_sign_extended() -> Result<(), DatabaseError> {
    assert_eq!(SerialType::Int8.decode(&[0xFF])?, Value::Integer(-1));
    assert_eq!(SerialType::Int8.decode(&[0x7F])?, Value::Integer(127));
    assert_eq!(SerialType::Int16.decode(&[0x80, 0x00])?, Value::Integer(-32768));
    assert_eq!(SerialType::Int24.decode(&[0xFF, 0xFF, 0xFE])?, Value::Integer(-2));
    assert_eq!(SerialType::Int24.decode(&[0x01, 0x00, 0x00])?, Value::Integer(65536));
    assert_eq!(
        SerialType::Int48.decode(&[0x80, 0, 0, 0, 0, 0])?,
        Value::Integer(-(1 << 47))
    );
    assert_eq!(
        SerialType::Int64.decode(&[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])?,
        Value::Integer(i64::MAX)
    );
    Ok(())
}

#[test]
fn test_constants_and_float() -> Result<(), DatabaseError> {
    assert_eq!(SerialType::Zero.decode(&[])?, Value::Integer(0));
    assert_eq!(SerialType::One.decode(&[])?, Value::Integer(1));
    assert_eq!(SerialType::Null.decode(&[])?, Value::Null);
    assert_eq!(
        SerialType::Float64.decode(&2.5f64.to_be_bytes())?,
        Value::Real(2.5)
    );
    Ok(())
}

#[test]
fn test_text_and_blob_lengths() -> Result<(), DatabaseError> {
    assert_eq!(SerialType::from_code(12)?, SerialType::Blob(0));
    assert_eq!(SerialType::from_code(23)?, SerialType::Text(5));
    assert_eq!(
        SerialType::from_code(23)?.decode(b"apple and more")?,
        Value::Text(b"apple".to_vec())
    );
    assert_eq!(
        SerialType::from_code(16)?.decode(&[1, 2, 3])?,
        Value::Blob(vec![1, 2])
    );
    Ok(())
}

#[test]
fn test_short_body_is_truncated_input() {
    let err = SerialType::Int32.decode(&[0, 1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedInput);
}
