//! Device command table for the hacker menu modules.

/// Lines written right after a port opens. Replies are not awaited.
pub const HANDSHAKE_LINES: [&str; 2] = ["HELLO", "PING"];

/// Menu key → device command.
const MODULE_COMMANDS: &[(&str, &str)] = &[
    ("scan", "RF_SCAN"),
    ("nfc", "NFC_CLONE"),
    ("subghz", "SUBGHZ_SCAN"),
    ("badusb", "BADUSB_INJECT"),
    ("ir", "IR_BLAST"),
    ("bt", "BT_SCAN"),
    ("gpio", "GPIO_CTRL"),
    ("terminal", "SHELL"),
];

/// Look up the device command for a menu key.
pub fn module_command(module_key: &str) -> Option<&'static str> {
    MODULE_COMMANDS
        .iter()
        .find(|(key, _)| *key == module_key)
        .map(|(_, cmd)| *cmd)
}

/// The `RUN <COMMAND>` line for a menu key, without the newline.
pub fn run_command_line(module_key: &str) -> Option<String> {
    module_command(module_key).map(|cmd| format!("RUN {cmd}"))
}
