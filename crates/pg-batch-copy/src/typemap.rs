//! Column type mapping for target table creation.
//!
//! The target table is created from the source's `information_schema`
//! metadata before any rows move, so every column type comes from this one
//! explicit table rather than being inferred from row values.

/// Map a source column's `udt_name` to the DDL type used on the target.
pub fn target_ddl_type(udt_name: &str, max_length: i32, precision: i32, scale: i32) -> String {
    match udt_name.to_lowercase().as_str() {
        // Boolean
        "bool" => "boolean".to_string(),

        // Integer types
        "int2" => "smallint".to_string(),
        "int4" => "integer".to_string(),
        "int8" => "bigint".to_string(),

        // Floating point
        "float4" => "real".to_string(),
        "float8" => "double precision".to_string(),

        // Decimal/numeric
        "numeric" => {
            if precision > 0 {
                format!("numeric({},{})", precision, scale)
            } else {
                "numeric".to_string()
            }
        }

        // String types
        "bpchar" => {
            if max_length > 0 {
                format!("char({})", max_length)
            } else {
                "text".to_string()
            }
        }
        "varchar" => {
            if max_length > 0 {
                format!("varchar({})", max_length)
            } else {
                "text".to_string()
            }
        }
        "text" | "name" | "citext" => "text".to_string(),

        // Binary
        "bytea" => "bytea".to_string(),

        // Date/time types
        "date" => "date".to_string(),
        "time" => "time".to_string(),
        "timetz" => "timetz".to_string(),
        "timestamp" => "timestamp".to_string(),
        "timestamptz" => "timestamptz".to_string(),

        // GUID
        "uuid" => "uuid".to_string(),

        // JSON
        "json" => "json".to_string(),
        "jsonb" => "jsonb".to_string(),

        // XML
        "xml" => "xml".to_string(),

        // Anything else (arrays, enums, extension types) is carried as text
        _ => "text".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert_eq!(target_ddl_type("int2", 0, 0, 0), "smallint");
        assert_eq!(target_ddl_type("int4", 0, 0, 0), "integer");
        assert_eq!(target_ddl_type("int8", 0, 0, 0), "bigint");
    }

    #[test]
    fn test_string_types() {
        assert_eq!(target_ddl_type("varchar", 255, 0, 0), "varchar(255)");
        assert_eq!(target_ddl_type("varchar", 0, 0, 0), "text");
        assert_eq!(target_ddl_type("bpchar", 10, 0, 0), "char(10)");
        assert_eq!(target_ddl_type("text", 0, 0, 0), "text");
    }

    #[test]
    fn test_numeric_types() {
        assert_eq!(target_ddl_type("numeric", 0, 18, 2), "numeric(18,2)");
        assert_eq!(target_ddl_type("numeric", 0, 0, 0), "numeric");
        assert_eq!(target_ddl_type("float8", 0, 0, 0), "double precision");
    }

    #[test]
    fn test_datetime_types() {
        assert_eq!(target_ddl_type("timestamp", 0, 0, 0), "timestamp");
        assert_eq!(target_ddl_type("timestamptz", 0, 0, 0), "timestamptz");
        assert_eq!(target_ddl_type("date", 0, 0, 0), "date");
    }

    #[test]
    fn test_special_types() {
        assert_eq!(target_ddl_type("uuid", 0, 0, 0), "uuid");
        assert_eq!(target_ddl_type("jsonb", 0, 0, 0), "jsonb");
        assert_eq!(target_ddl_type("bytea", 0, 0, 0), "bytea");
    }

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        assert_eq!(target_ddl_type("_int4", 0, 0, 0), "text");
        assert_eq!(target_ddl_type("mood", 0, 0, 0), "text");
    }
}
