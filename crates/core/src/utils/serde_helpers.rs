//! Serde utility helpers for case-insensitive deserialization

/// Implements case-insensitive deserialization for a fieldless enum.
///
/// Usage:
/// ```ignore
/// impl_case_insensitive_deserialize!(
///     MyEnum,
///     Variant1 => "variant1",
///     Variant2 => "variant2"
/// );
/// ```
#[macro_export]
macro_rules! impl_case_insensitive_deserialize {
    ($enum_type:ty, $($variant:ident => $str_val:expr),+ $(,)?) => {
        impl<'de> serde::Deserialize<'de> for $enum_type {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                match s.to_lowercase().replace('-', "_").as_str() {
                    $(
                        $str_val => Ok(Self::$variant),
                    )+
                    _ => Err(serde::de::Error::custom(format!(
                        "unknown variant '{}', expected one of: {}",
                        s,
                        [$($str_val),+].join(", ")
                    ))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    enum Strategy {
        SourceFile,
        Package,
    }

    impl_case_insensitive_deserialize!(
        Strategy,
        SourceFile => "source_file",
        Package => "package"
    );

    #[test]
    fn test_case_insensitive_deserialize() {
        let result: Strategy = serde_json::from_str(r#""package""#).unwrap();
        assert_eq!(result, Strategy::Package);

        let result: Strategy = serde_json::from_str(r#""PACKAGE""#).unwrap();
        assert_eq!(result, Strategy::Package);

        let result: Strategy = serde_json::from_str(r#""Source-File""#).unwrap();
        assert_eq!(result, Strategy::SourceFile);

        let result: Result<Strategy, _> = serde_json::from_str(r#""invalid""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown variant"));
        assert!(err.contains("expected one of: source_file, package"));
    }
}
