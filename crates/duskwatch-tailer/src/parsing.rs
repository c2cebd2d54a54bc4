//! Best-effort line parsing: three ordered regex templates with a
//! raw-only fallback, tried in the order an incoming line is most
//! likely to match.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

fn rfc3164_with_priority() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^<(?P<priority>\d+)>
            (?P<timestamp>\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+
            (?P<hostname>\S+)\s+
            (?P<tag>[^:\[]+?)(?:\[(?P<pid>\d+)\])?:\s*
            (?P<message>.*)$
            ",
        )
        .unwrap()
    })
}

fn rfc5424() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^<(?P<priority>\d+)>(?P<version>\d+)\s+
            (?P<timestamp>\S+)\s+
            (?P<hostname>\S+)\s+
            (?P<appname>\S+)\s+
            (?P<procid>\S+)\s+
            (?P<msgid>\S+)\s+
            (?P<structdata>\S+)?\s*
            (?P<message>.*)$
            ",
        )
        .unwrap()
    })
}

fn rfc3164_without_priority() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?P<timestamp>\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+
            (?P<hostname>\S+)\s+
            (?P<tag>[^:\[]+?)(?:\[(?P<pid>\d+)\])?:\s*
            (?P<message>.*)$
            ",
        )
        .unwrap()
    })
}

/// Parse one line against the three templates in order, falling back to
/// a raw-only field set (just `message`) when none match.
pub fn parse_line(line: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    if let Some(caps) = rfc3164_with_priority().captures(line) {
        insert(&mut fields, "priority", caps.name("priority"));
        insert(&mut fields, "timestamp", caps.name("timestamp"));
        insert(&mut fields, "hostname", caps.name("hostname"));
        insert(&mut fields, "tag", caps.name("tag"));
        insert(&mut fields, "pid", caps.name("pid"));
        insert(&mut fields, "message", caps.name("message"));
        return fields;
    }

    if let Some(caps) = rfc5424().captures(line) {
        insert(&mut fields, "priority", caps.name("priority"));
        insert(&mut fields, "version", caps.name("version"));
        insert(&mut fields, "timestamp", caps.name("timestamp"));
        insert(&mut fields, "hostname", caps.name("hostname"));
        insert(&mut fields, "appname", caps.name("appname"));
        insert(&mut fields, "procid", caps.name("procid"));
        insert(&mut fields, "msgid", caps.name("msgid"));
        insert(&mut fields, "message", caps.name("message"));
        return fields;
    }

    if let Some(caps) = rfc3164_without_priority().captures(line) {
        insert(&mut fields, "timestamp", caps.name("timestamp"));
        insert(&mut fields, "hostname", caps.name("hostname"));
        insert(&mut fields, "tag", caps.name("tag"));
        insert(&mut fields, "pid", caps.name("pid"));
        insert(&mut fields, "message", caps.name("message"));
        return fields;
    }

    fields.insert("message".to_string(), line.to_string());
    fields
}

fn insert(fields: &mut BTreeMap<String, String>, key: &str, value: Option<regex::Match>) {
    if let Some(m) = value {
        let text = m.as_str().trim();
        if !text.is_empty() && text != "-" {
            fields.insert(key.to_string(), text.to_string());
        }
    }
}

/// The text a lightweight scorer should run keyword matching against:
/// the parsed `message` field if present, otherwise the whole line.
pub fn message_of<'a>(fields: &'a BTreeMap<String, String>, line: &'a str) -> &'a str {
    fields.get("message").map(String::as_str).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3164_with_priority_extracts_tag_and_pid() {
        let fields = parse_line("<34>Oct 11 22:14:15 mymachine sshd[1234]: Failed password for root");
        assert_eq!(fields.get("hostname").unwrap(), "mymachine");
        assert_eq!(fields.get("tag").unwrap(), "sshd");
        assert_eq!(fields.get("pid").unwrap(), "1234");
        assert_eq!(fields.get("message").unwrap(), "Failed password for root");
    }

    #[test]
    fn rfc5424_extracts_appname_and_structured_data() {
        let fields = parse_line(
            "<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 - BOMsome message",
        );
        assert_eq!(fields.get("hostname").unwrap(), "mymachine.example.com");
        assert_eq!(fields.get("appname").unwrap(), "evntslog");
        assert_eq!(fields.get("msgid").unwrap(), "ID47");
    }

    #[test]
    fn rfc3164_without_priority_is_tried_third() {
        let fields = parse_line("Oct 11 22:14:15 mymachine cron[88]: job finished");
        assert_eq!(fields.get("tag").unwrap(), "cron");
        assert_eq!(fields.get("message").unwrap(), "job finished");
    }

    #[test]
    fn unparseable_line_falls_back_to_raw_message() {
        let fields = parse_line("total garbage that matches nothing");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("message").unwrap(), "total garbage that matches nothing");
    }
}
