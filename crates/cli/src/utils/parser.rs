/// Splits `path:line` into the path and a 1-based line number.
///
/// A suffix that isn't a number is part of the path.
pub fn parse_filepath_with_line(filepath_arg: &str) -> (String, Option<usize>) {
    if let Some(colon_pos) = filepath_arg.rfind(':') {
        let path_part = &filepath_arg[..colon_pos];
        let line_part = &filepath_arg[colon_pos + 1..];

        match line_part.parse::<usize>() {
            Ok(line_num) if line_num > 0 => (path_part.to_string(), Some(line_num)),
            _ => (filepath_arg.to_string(), None),
        }
    } else {
        (filepath_arg.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filepath_with_line() {
        assert_eq!(
            parse_filepath_with_line("pkg/FooTest.java:12"),
            ("pkg/FooTest.java".to_string(), Some(12))
        );
        assert_eq!(
            parse_filepath_with_line("pkg/FooTest.java"),
            ("pkg/FooTest.java".to_string(), None)
        );
        assert_eq!(
            parse_filepath_with_line("C:dir/file.rs:x"),
            ("C:dir/file.rs:x".to_string(), None)
        );
        assert_eq!(parse_filepath_with_line("a.rs:0"), ("a.rs:0".to_string(), None));
    }
}
