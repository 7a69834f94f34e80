use sdl2::keyboard::Keycode;

/// # Keymap
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// This original layout is mapped to the left 4 alphanumeric columns.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
pub fn keymap(key: Keycode) -> Option<u8> {
    match key {
        Keycode::X => Some(0x0),
        Keycode::Num1 => Some(0x1),
        Keycode::Num2 => Some(0x2),
        Keycode::Num3 => Some(0x3),
        Keycode::Q => Some(0x4),
        Keycode::W => Some(0x5),
        Keycode::E => Some(0x6),
        Keycode::A => Some(0x7),
        Keycode::S => Some(0x8),
        Keycode::D => Some(0x9),
        Keycode::Z => Some(0xA),
        Keycode::C => Some(0xB),
        Keycode::Num4 => Some(0xC),
        Keycode::R => Some(0xD),
        Keycode::F => Some(0xE),
        Keycode::V => Some(0xF),
        _ => None,
    }
}

/// A hex digit typed as itself, `0-9` and `a-f` in either case.
/// Used for keys the 4x4 layout leaves free and for headless input on stdin.
pub fn from_hex_char(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

/// Looks a key up in the 4x4 layout first, then as a typed hex digit.
/// Only the keys the layout leaves free (0, 5-9 and B) reach the hex fallback;
/// A, C, D, E and F keep their layout meaning. Stdin input in headless mode
/// goes through `from_hex_char` directly and covers all of 0-F.
pub fn lookup(key: Keycode) -> Option<u8> {
    keymap(key).or_else(|| {
        let name = key.name();
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => from_hex_char(c),
            _ => None,
        }
    })
}
