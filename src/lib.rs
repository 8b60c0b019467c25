#![allow(clippy::module_inception)]

use std::{fs, path::PathBuf, rc::Rc};

use crate::errors::errors::{Error, ErrorTip};

pub mod ast;
pub mod errors;
pub mod macros;
pub mod resolver;

#[derive(Debug, Clone)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn null() -> Self {
        Span {
            start: Position::null(),
            end: Position::null(),
        }
    }
}

/// Locates the 1-based line containing a byte offset, returning the line
/// number, its text and the offset within the line. `None` when the file
/// cannot be read or the offset lies past its end.
pub fn get_line_at_position(file: PathBuf, position: u32) -> Option<(usize, String, usize)> {
    let content = fs::read_to_string(&file).ok()?;
    let pos = position as usize;

    let mut start = 0;
    for (index, line) in content.split_inclusive('\n').enumerate() {
        let end = start + line.len();
        if (start..end).contains(&pos) {
            return Some((index + 1, line.to_string(), pos - start));
        }
        start = end;
    }
    None
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let (line_number, line, line_pos) =
            super::get_line_at_position(std::path::PathBuf::from("tests/test_file.txt"), 10)
                .unwrap();
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) =
            super::get_line_at_position(std::path::PathBuf::from("tests/test_file.txt"), 34)
                .unwrap();
        assert_eq!(line_number, 4);
        assert_eq!(line, "Testing { }\n");
        assert_eq!(line_pos, 8);
    }

    #[test]
    fn test_get_line_at_position_out_of_range() {
        let looked_up =
            super::get_line_at_position(std::path::PathBuf::from("tests/test_file.txt"), 9999);
        assert!(looked_up.is_none());
        let looked_up =
            super::get_line_at_position(std::path::PathBuf::from("tests/no_such_file.txt"), 0);
        assert!(looked_up.is_none());
    }
}

pub fn display_error(error: Error, file: PathBuf) {
    /*
        error: message
        -> module.lang
           |
        20 | obj Missing value;
           | --------^
    */

    if let ErrorTip::None = error.get_tip() {
        println!("Error: {}", error.get_error_name());
    } else {
        println!("Error: {} ({})", error.get_error_name(), error.get_tip());
    }
    println!("-> {}", file.as_os_str().to_string_lossy());

    // Without a resolvable source location the header alone is printed.
    let position = error.get_position();
    let Some((line, line_text, line_pos)) = get_line_at_position(file, position.0) else {
        return;
    };

    let line_string = line.to_string();
    let padding = line_string.len() + 2;
    println!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    println!("{} | {}", line_string, line_text_removed.trim());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    println!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
