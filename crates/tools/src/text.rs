/// Uppercase the first character, leave the rest untouched
pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first_letter() {
        assert_eq!(capitalize_first_letter("object"), "Object");
        assert_eq!(capitalize_first_letter("sTRING"), "STRING");
        assert_eq!(capitalize_first_letter("émile"), "Émile");
        assert_eq!(capitalize_first_letter(""), "");
    }
}
