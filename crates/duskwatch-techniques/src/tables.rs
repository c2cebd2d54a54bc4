//! Fixed event-id and keyword lookup tables, carried over from the prior
//! platform's hardcoded MITRE ATT&CK event/keyword maps.

/// Windows event ID to technique ID, checked before the keyword table.
pub const EVENT_ID_TECHNIQUE: &[(&str, &str)] = &[
    ("4624", "T1078"),
    ("4625", "T1110"),
    ("4672", "T1078.002"),
    ("4720", "T1136"),
    ("4732", "T1098"),
    ("4688", "T1059"),
    ("4698", "T1053.005"),
    ("5140", "T1021.002"),
    ("7045", "T1543.003"),
];

/// Substring keyword to technique ID, scanned against the lowercased
/// concatenation of a record's message and event type.
pub const KEYWORD_TECHNIQUE: &[(&str, &str)] = &[
    ("powershell", "T1059.001"),
    ("cmd.exe", "T1059.003"),
    ("wmic", "T1047"),
    ("mimikatz", "T1003"),
    ("credential", "T1003"),
    ("password", "T1003"),
    ("registry", "T1112"),
    ("scheduled task", "T1053"),
    ("service", "T1543"),
    ("remote desktop", "T1021.001"),
    ("ssh", "T1021.004"),
    ("lateral movement", "T1021"),
    ("privilege escalation", "T1068"),
    ("persistence", "T1546"),
];

pub fn lookup_event_id(event_id: &str) -> Option<&'static str> {
    EVENT_ID_TECHNIQUE.iter().find(|(id, _)| *id == event_id).map(|(_, t)| *t)
}

/// Every keyword hit against `combined_text`, in table order.
pub fn lookup_keywords(combined_text: &str) -> Vec<&'static str> {
    KEYWORD_TECHNIQUE
        .iter()
        .filter(|(keyword, _)| combined_text.contains(keyword))
        .map(|(_, technique)| *technique)
        .collect()
}
