/// Sinclair BASIC program lister (ZX Spectrum 48K and 128K)
///
/// Program lines are stored as:
/// - line number, 2 bytes big-endian
/// - text length, 2 bytes little-endian, including the final 0x0D
/// - tokenized text; literal numbers are followed by 0x0E and a hidden
///   5-byte binary copy of their value
///
/// The program ends where the variables area starts, which is the first
/// "line number" with one of its two top bits set.

/// Sinclair BASIC mode (48K or 128K)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinclairBasicMode {
    /// 48K mode - 0xA3 and 0xA4 are user-defined graphics T and U
    Mode48K,
    /// 128K mode - 0xA3 is SPECTRUM and 0xA4 is PLAY
    #[default]
    Mode128K,
}

/// Hidden binary number marker
const NUMBER_MARKER: u8 = 0x0E;

/// Bytes of the hidden binary number
const NUMBER_LENGTH: usize = 5;

/// List a program in 128K mode
pub fn list_basic(data: &[u8]) -> String {
    decode_sinclair_basic(data, SinclairBasicMode::default())
}

/// List a tokenized program as text, one line per program line
///
/// Decoding stops at the variables area or at a truncated line header. A
/// line cut short by the end of the data is listed as far as it goes.
pub fn decode_sinclair_basic(data: &[u8], mode: SinclairBasicMode) -> String {
    let mut output = String::new();
    let mut pos = 0;

    while pos + 4 <= data.len() {
        if data[pos] & 0xC0 != 0 {
            break;
        }

        let line_num = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let line_len = u16::from_le_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        let line_end = (pos + line_len).min(data.len());
        output.push_str(&format!("{} ", line_num));
        output.push_str(&decode_line(&data[pos..line_end], mode));
        output.push('\n');

        pos += line_len;
    }

    output
}

/// Decode a single line body (without line number and length)
fn decode_line(data: &[u8], mode: SinclairBasicMode) -> String {
    let mut output = String::new();
    let mut pos = 0;

    while pos < data.len() {
        let byte = data[pos];
        pos += 1;

        match byte {
            0x0D => break,

            // The digits were already printed as text
            NUMBER_MARKER => pos += NUMBER_LENGTH,

            // INK, PAPER, FLASH, BRIGHT, INVERSE and OVER take one parameter
            0x10..=0x15 => pos += 1,

            // AT and TAB take two
            0x16 | 0x17 => pos += 2,

            0x60 => output.push('£'),
            0x7F => output.push('©'),
            0x20..=0x7E => output.push(byte as char),

            0x80..=0x8F => output.push(BLOCK_GRAPHICS[(byte - 0x80) as usize]),

            0x90..=0xA2 => push_udg(&mut output, byte),

            0xA3 | 0xA4 if mode == SinclairBasicMode::Mode48K => push_udg(&mut output, byte),

            0xA3..=0xFF => {
                if !output.is_empty() && !output.ends_with(' ') {
                    output.push(' ');
                }
                output.push_str(keyword(byte));
                output.push(' ');
            }

            _ => {}
        }
    }

    output
}

fn push_udg(output: &mut String, byte: u8) {
    output.push_str("UDG-");
    output.push((b'A' + (byte - 0x90)) as char);
}

/// 2x2 block graphics, bit 0 top right, bit 1 top left, bit 2 bottom right,
/// bit 3 bottom left
const BLOCK_GRAPHICS: [char; 16] = [
    ' ', '▝', '▘', '▀', '▗', '▐', '▚', '▜', '▖', '▞', '▌', '▛', '▄', '▟', '▙', '█',
];

/// Keyword for a token byte (0xA3-0xFF)
fn keyword(token: u8) -> &'static str {
    match token {
        0xA3 => "SPECTRUM",
        0xA4 => "PLAY",
        0xA5 => "RND",
        0xA6 => "INKEY$",
        0xA7 => "PI",
        0xA8 => "FN",
        0xA9 => "POINT",
        0xAA => "SCREEN$",
        0xAB => "ATTR",
        0xAC => "AT",
        0xAD => "TAB",
        0xAE => "VAL$",
        0xAF => "CODE",
        0xB0 => "VAL",
        0xB1 => "LEN",
        0xB2 => "SIN",
        0xB3 => "COS",
        0xB4 => "TAN",
        0xB5 => "ASN",
        0xB6 => "ACS",
        0xB7 => "ATN",
        0xB8 => "LN",
        0xB9 => "EXP",
        0xBA => "INT",
        0xBB => "SQR",
        0xBC => "SGN",
        0xBD => "ABS",
        0xBE => "PEEK",
        0xBF => "IN",
        0xC0 => "USR",
        0xC1 => "STR$",
        0xC2 => "CHR$",
        0xC3 => "NOT",
        0xC4 => "BIN",
        0xC5 => "OR",
        0xC6 => "AND",
        0xC7 => "<=",
        0xC8 => ">=",
        0xC9 => "<>",
        0xCA => "LINE",
        0xCB => "THEN",
        0xCC => "TO",
        0xCD => "STEP",
        0xCE => "DEF FN",
        0xCF => "CAT",
        0xD0 => "FORMAT",
        0xD1 => "MOVE",
        0xD2 => "ERASE",
        0xD3 => "OPEN #",
        0xD4 => "CLOSE #",
        0xD5 => "MERGE",
        0xD6 => "VERIFY",
        0xD7 => "BEEP",
        0xD8 => "CIRCLE",
        0xD9 => "INK",
        0xDA => "PAPER",
        0xDB => "FLASH",
        0xDC => "BRIGHT",
        0xDD => "INVERSE",
        0xDE => "OVER",
        0xDF => "OUT",
        0xE0 => "LPRINT",
        0xE1 => "LLIST",
        0xE2 => "STOP",
        0xE3 => "READ",
        0xE4 => "DATA",
        0xE5 => "RESTORE",
        0xE6 => "NEW",
        0xE7 => "BORDER",
        0xE8 => "CONTINUE",
        0xE9 => "DIM",
        0xEA => "REM",
        0xEB => "FOR",
        0xEC => "GO TO",
        0xED => "GO SUB",
        0xEE => "INPUT",
        0xEF => "LOAD",
        0xF0 => "LIST",
        0xF1 => "LET",
        0xF2 => "PAUSE",
        0xF3 => "NEXT",
        0xF4 => "POKE",
        0xF5 => "PRINT",
        0xF6 => "PLOT",
        0xF7 => "RUN",
        0xF8 => "SAVE",
        0xF9 => "RANDOMIZE",
        0xFA => "IF",
        0xFB => "CLS",
        0xFC => "DRAW",
        0xFD => "CLEAR",
        0xFE => "RETURN",
        _ => "COPY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_line() {
        // 10 PRINT "HI"
        let data = [0x00, 0x0A, 0x06, 0x00, 0xF5, 0x22, b'H', b'I', 0x22, 0x0D];
        assert_eq!(list_basic(&data), "10 PRINT \"HI\"\n");
    }

    #[test]
    fn test_number_is_printed_once() {
        // 20 GO TO 10
        let data = [
            0x00, 0x14, 0x0A, 0x00, 0xEC, b'1', b'0', 0x0E, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x0D,
        ];
        assert_eq!(list_basic(&data), "20 GO TO 10\n");
    }

    #[test]
    fn test_keyword_spacing_after_colon() {
        // 1 CLS : RUN
        let data = [0x00, 0x01, 0x04, 0x00, 0xFB, b':', 0xF7, 0x0D];
        assert_eq!(list_basic(&data), "1 CLS : RUN \n");
    }

    #[test]
    fn test_colour_controls_are_hidden() {
        // 5 PRINT INK 2;"X" with the embedded control sequence 0x10 0x02
        let data = [0x00, 0x05, 0x07, 0x00, 0xF5, 0x10, 0x02, 0x22, b'X', 0x22, 0x0D];
        assert_eq!(list_basic(&data), "5 PRINT \"X\"\n");
    }

    #[test]
    fn test_mode_dependent_tokens() {
        let data = [0x00, 0x01, 0x02, 0x00, 0xA4, 0x0D];
        assert_eq!(decode_sinclair_basic(&data, SinclairBasicMode::Mode128K), "1 PLAY \n");
        assert_eq!(decode_sinclair_basic(&data, SinclairBasicMode::Mode48K), "1 UDG-U\n");
    }

    #[test]
    fn test_graphics_characters() {
        let data = [0x00, 0x01, 0x05, 0x00, 0x60, 0x7F, 0x8F, 0x90, 0x0D];
        assert_eq!(list_basic(&data), "1 £©█UDG-A\n");
    }

    #[test]
    fn test_stops_at_variables() {
        let mut data = vec![0x00, 0x01, 0x02, 0x00, 0xFB, 0x0D];
        data.extend_from_slice(&[0x80, 0xAA, 0x01, 0x00]);
        assert_eq!(list_basic(&data), "1 CLS \n");
    }

    #[test]
    fn test_truncated_line() {
        let data = [0x00, 0x0A, 0x10, 0x00, 0xF5, 0x22, b'A'];
        assert_eq!(list_basic(&data), "10 PRINT \"A\n");
        assert_eq!(list_basic(&[0x00, 0x0A]), "");
    }
}
