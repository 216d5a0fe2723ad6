//! Parsing of the model's `COORDINATES: x,y` answer line.

/// Extract the last `COORDINATES: x,y` pair from a model response.
/// `COORDINATES: NOT_FOUND`, or anything unparseable, yields `None`.
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let mut found = None;
    for (idx, _) in text.match_indices("COORDINATES:") {
        let rest = text[idx + "COORDINATES:".len()..].trim_start();
        if rest.starts_with("NOT_FOUND") {
            found = None;
            continue;
        }
        let line = rest.lines().next().unwrap_or_default();
        let mut parts = line.splitn(2, ',');
        let x = parts.next().map(str::trim).and_then(|v| v.parse::<f64>().ok());
        let y = parts
            .next()
            .map(|v| v.trim().trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.'))
            .and_then(|v| v.trim().parse::<f64>().ok());
        if let (Some(x), Some(y)) = (x, y) {
            found = Some((x, y));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pair() {
        assert_eq!(parse_coordinates("COORDINATES: 640,330"), Some((640.0, 330.0)));
    }

    #[test]
    fn takes_the_last_answer_line() {
        let text = "thinking... COORDINATES: 10,10\nfinal answer\nCOORDINATES: 222, 118";
        assert_eq!(parse_coordinates(text), Some((222.0, 118.0)));
    }

    #[test]
    fn not_found_sentinel_yields_none() {
        assert_eq!(parse_coordinates("COORDINATES: NOT_FOUND"), None);
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(parse_coordinates("the element is near the top"), None);
        assert_eq!(parse_coordinates("COORDINATES: left,up"), None);
    }
}
