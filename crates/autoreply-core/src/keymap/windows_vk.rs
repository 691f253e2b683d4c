//! Windows Virtual Key (VK) name table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! `VK_NAME_TABLE` is a compile-time array of 256 optional names indexed by
//! VK code.  Position 0x0D holds `"Enter"` because `VK_RETURN` is 0x0D.  Codes
//! without a name store `None`.  The canonical name is what [`vk_name`]
//! prints; [`vk_from_name`] additionally accepts a handful of aliases
//! (`"Control"`, `"Return"`, `"Esc"`, ...).
//!
//! # Extended keys
//!
//! Keys on the navigation cluster, the right-hand modifiers, the Windows keys
//! and the numeric-pad divide share their scan code with a key elsewhere on the
//! board.  Windows distinguishes them through bit 24 of the key message
//! `lParam`, which [`is_extended_vk`] reports.  Numeric-pad Enter has no VK
//! code of its own (it is `VK_RETURN` + extended), so it is handled by the
//! chord parser rather than this table.

/// Canonical name for `vk`, or `None` if the code is unnamed.
pub fn vk_name(vk: u8) -> Option<&'static str> {
    VK_NAME_TABLE[vk as usize]
}

/// Looks up a VK code by name, case-insensitively, accepting aliases.
pub fn vk_from_name(name: &str) -> Option<u8> {
    if let Some(&(_, vk)) = ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
    {
        return Some(vk);
    }
    // The table is 256 entries; a linear scan is fine for config parsing.
    VK_NAME_TABLE
        .iter()
        .position(|entry| entry.is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .map(|vk| vk as u8)
}

/// `true` if `vk` needs the extended-key flag in its key messages.
pub fn is_extended_vk(vk: u8) -> bool {
    EXTENDED_VKS.contains(&vk)
}

const EXTENDED_VKS: &[u8] = &[
    0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav
    0x2D, 0x2E, // Insert, Delete
    0x5B, 0x5C, 0x5D, // Win keys, Apps
    0x6F, // Numpad divide
    0x90, // NumLock
    0xA3, 0xA5, // Right Ctrl, Right Alt
];

const ALIASES: &[(&str, u8)] = &[
    ("Control", 0x11),
    ("Menu", 0x12),
    ("Return", 0x0D),
    ("Esc", 0x1B),
    ("Backspace", 0x08),
    ("Del", 0x2E),
    ("Ins", 0x2D),
    ("PgUp", 0x21),
    ("PgDn", 0x22),
    ("Win", 0x5B),
];

const VK_NAME_TABLE: [Option<&'static str>; 256] = {
    let mut t: [Option<&'static str>; 256] = [None; 256];

    // ── Control keys ─────────────────────────────────────────────────────────
    t[0x08] = Some("Back");
    t[0x09] = Some("Tab");
    t[0x0D] = Some("Enter");
    t[0x10] = Some("Shift");
    t[0x11] = Some("Ctrl");
    t[0x12] = Some("Alt");
    t[0x13] = Some("Pause");
    t[0x14] = Some("CapsLock");
    t[0x1B] = Some("Escape");
    t[0x20] = Some("Space");

    // ── Navigation cluster ───────────────────────────────────────────────────
    t[0x21] = Some("PageUp");
    t[0x22] = Some("PageDown");
    t[0x23] = Some("End");
    t[0x24] = Some("Home");
    t[0x25] = Some("Left");
    t[0x26] = Some("Up");
    t[0x27] = Some("Right");
    t[0x28] = Some("Down");
    t[0x2C] = Some("PrintScreen");
    t[0x2D] = Some("Insert");
    t[0x2E] = Some("Delete");

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    t[0x30] = Some("0");
    t[0x31] = Some("1");
    t[0x32] = Some("2");
    t[0x33] = Some("3");
    t[0x34] = Some("4");
    t[0x35] = Some("5");
    t[0x36] = Some("6");
    t[0x37] = Some("7");
    t[0x38] = Some("8");
    t[0x39] = Some("9");

    // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────────
    t[0x41] = Some("A");
    t[0x42] = Some("B");
    t[0x43] = Some("C");
    t[0x44] = Some("D");
    t[0x45] = Some("E");
    t[0x46] = Some("F");
    t[0x47] = Some("G");
    t[0x48] = Some("H");
    t[0x49] = Some("I");
    t[0x4A] = Some("J");
    t[0x4B] = Some("K");
    t[0x4C] = Some("L");
    t[0x4D] = Some("M");
    t[0x4E] = Some("N");
    t[0x4F] = Some("O");
    t[0x50] = Some("P");
    t[0x51] = Some("Q");
    t[0x52] = Some("R");
    t[0x53] = Some("S");
    t[0x54] = Some("T");
    t[0x55] = Some("U");
    t[0x56] = Some("V");
    t[0x57] = Some("W");
    t[0x58] = Some("X");
    t[0x59] = Some("Y");
    t[0x5A] = Some("Z");

    // ── Windows keys ─────────────────────────────────────────────────────────
    t[0x5B] = Some("LWin");
    t[0x5C] = Some("RWin");
    t[0x5D] = Some("Apps");

    // ── Numeric keypad ───────────────────────────────────────────────────────
    t[0x60] = Some("Numpad0");
    t[0x61] = Some("Numpad1");
    t[0x62] = Some("Numpad2");
    t[0x63] = Some("Numpad3");
    t[0x64] = Some("Numpad4");
    t[0x65] = Some("Numpad5");
    t[0x66] = Some("Numpad6");
    t[0x67] = Some("Numpad7");
    t[0x68] = Some("Numpad8");
    t[0x69] = Some("Numpad9");
    t[0x6A] = Some("NumpadMultiply");
    t[0x6B] = Some("NumpadAdd");
    t[0x6D] = Some("NumpadSubtract");
    t[0x6E] = Some("NumpadDecimal");
    t[0x6F] = Some("NumpadDivide");

    // ── Function keys (VK_F1=0x70 … VK_F12=0x7B) ────────────────────────────
    t[0x70] = Some("F1");
    t[0x71] = Some("F2");
    t[0x72] = Some("F3");
    t[0x73] = Some("F4");
    t[0x74] = Some("F5");
    t[0x75] = Some("F6");
    t[0x76] = Some("F7");
    t[0x77] = Some("F8");
    t[0x78] = Some("F9");
    t[0x79] = Some("F10");
    t[0x7A] = Some("F11");
    t[0x7B] = Some("F12");

    // ── Lock keys ────────────────────────────────────────────────────────────
    t[0x90] = Some("NumLock");
    t[0x91] = Some("ScrollLock");

    // ── Sided modifiers ──────────────────────────────────────────────────────
    t[0xA0] = Some("LShift");
    t[0xA1] = Some("RShift");
    t[0xA2] = Some("LCtrl");
    t[0xA3] = Some("RCtrl");
    t[0xA4] = Some("LAlt");
    t[0xA5] = Some("RAlt");

    t
};
