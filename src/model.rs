// ABOUTME: Export report types and tolerant extraction from Memos API JSON
// ABOUTME: API payloads stay loose serde_json values until shaped into records

use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The document written to `memos_export.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub export_time: DateTime<Local>,
    pub host: String,
    pub user: Option<UserRecord>,
    pub memos: Vec<MemoRecord>,
    pub summary: ExportSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_memos: usize,
    pub total_attachments: usize,
    pub export_errors: Vec<String>,
}

impl ExportReport {
    pub fn new(host: &str) -> Self {
        ExportReport {
            export_time: Local::now(),
            host: host.trim_end_matches('/').to_string(),
            user: None,
            memos: Vec::new(),
            summary: ExportSummary::default(),
        }
    }

    /// Appends a finished memo and counts its attachments.
    pub fn push_memo(&mut self, memo: MemoRecord) {
        self.summary.total_attachments += memo.attachments.len();
        self.memos.push(memo);
    }

    pub fn push_error(&mut self, message: String) {
        self.summary.export_errors.push(message);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
}

impl UserRecord {
    /// Reads the `user` object of a session response. Missing fields become `None`.
    pub fn from_session(session: &Value) -> Self {
        let user = session.get("user");
        let field = |key: &str| {
            user.and_then(|u| u.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        UserRecord {
            name: field("name"),
            username: field("username"),
            email: field("email"),
            display_name: field("display_name").or_else(|| field("displayName")),
            role: field("role"),
        }
    }

    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoRecord {
    pub name: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub display_time: String,
    pub visibility: String,
    pub pinned: bool,
    pub tags: Vec<String>,
    pub snippet: String,
    pub state: String,
    pub attachments: Vec<AttachmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Value>,
}

impl MemoRecord {
    /// Builds a record from a memo detail (or listing summary) object.
    pub fn from_detail(detail: &Value, attachments: Vec<AttachmentRef>) -> Result<Self> {
        let obj = as_object(detail, "memo")?;

        Ok(MemoRecord {
            name: str_or(obj, "name", ""),
            content: str_or(obj, "content", ""),
            created_at: str_or(obj, "createTime", ""),
            updated_at: str_or(obj, "updateTime", ""),
            display_time: str_or(obj, "displayTime", ""),
            visibility: str_or(obj, "visibility", "PRIVATE"),
            pinned: obj.get("pinned").and_then(Value::as_bool).unwrap_or(false),
            tags: obj
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            snippet: str_or(obj, "snippet", ""),
            state: str_or(obj, "state", "NORMAL"),
            attachments,
            location: non_empty(obj, "location"),
            parent: non_empty(obj, "parent"),
            relations: non_empty(obj, "relations"),
            reactions: non_empty(obj, "reactions"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub created_at: String,
}

/// Attachment metadata as listed under a memo.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentMeta {
    pub name: String,
    pub filename: String,
    pub kind: String,
    pub size: u64,
    pub created_at: String,
}

impl AttachmentMeta {
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = as_object(value, "attachment")?;

        // int64 fields arrive as decimal strings from the JSON gateway
        let size = match obj.get("size") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };

        Ok(AttachmentMeta {
            name: str_or(obj, "name", ""),
            filename: str_or(obj, "filename", ""),
            kind: str_or(obj, "type", ""),
            size,
            created_at: str_or(obj, "createTime", ""),
        })
    }

    /// Parses the raw `attachments` value of a memo. `null` means none.
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            other => Err(Error::Malformed(format!(
                "attachments should be a list, got {}",
                type_name(other)
            ))),
        }
    }

    pub fn into_ref(self, file_path: String) -> AttachmentRef {
        AttachmentRef {
            id: self.name,
            filename: self.filename,
            file_path,
            kind: self.kind,
            size: self.size,
            created_at: self.created_at,
        }
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        Error::Malformed(format!(
            "{} should be an object, got {}",
            what,
            type_name(value)
        ))
    })
}

fn str_or(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn non_empty(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| is_truthy(v)).cloned()
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_session_full() {
        let session = json!({
            "user": {
                "name": "users/1",
                "username": "alice",
                "email": "alice@example.com",
                "displayName": "Alice",
                "role": "HOST"
            }
        });
        let user = UserRecord::from_session(&session);
        assert_eq!(user.name.as_deref(), Some("users/1"));
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.label(), "Alice");
    }

    #[test]
    fn test_user_from_session_missing_fields() {
        let user = UserRecord::from_session(&json!({"user": {"username": "bob"}}));
        assert_eq!(user.username.as_deref(), Some("bob"));
        assert!(user.email.is_none());
        assert!(user.role.is_none());
        assert_eq!(user.label(), "bob");

        let empty = UserRecord::from_session(&json!({}));
        assert_eq!(empty, UserRecord::default());
        assert_eq!(empty.label(), "Unknown");
    }

    #[test]
    fn test_memo_record_defaults() {
        let memo = MemoRecord::from_detail(&json!({"name": "memos/1"}), Vec::new()).unwrap();
        assert_eq!(memo.name, "memos/1");
        assert_eq!(memo.content, "");
        assert_eq!(memo.visibility, "PRIVATE");
        assert_eq!(memo.state, "NORMAL");
        assert!(!memo.pinned);
        assert!(memo.tags.is_empty());
        assert!(memo.location.is_none());
    }

    #[test]
    fn test_memo_record_full() {
        let detail = json!({
            "name": "memos/7",
            "content": "héllo #tag",
            "createTime": "2025-01-01T00:00:00Z",
            "updateTime": "2025-01-02T00:00:00Z",
            "displayTime": "2025-01-01T00:00:00Z",
            "visibility": "PUBLIC",
            "pinned": true,
            "tags": ["tag"],
            "snippet": "héllo",
            "state": "ARCHIVED",
            "location": {"placeholder": "Home", "latitude": 1.5, "longitude": 2.5},
            "parent": "",
            "relations": [],
            "reactions": [{"reactionType": "👍"}]
        });
        let memo = MemoRecord::from_detail(&detail, Vec::new()).unwrap();
        assert_eq!(memo.created_at, "2025-01-01T00:00:00Z");
        assert_eq!(memo.tags, vec!["tag".to_string()]);
        assert!(memo.pinned);
        assert!(memo.location.is_some());
        assert!(memo.parent.is_none());
        assert!(memo.relations.is_none());
        assert!(memo.reactions.is_some());

        let out = serde_json::to_value(&memo).unwrap();
        assert!(out.get("parent").is_none());
        assert!(out.get("reactions").is_some());
    }

    #[test]
    fn test_memo_record_rejects_non_object() {
        let err = MemoRecord::from_detail(&json!(["memos/1"]), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_attachment_size_number_or_string() {
        let a = AttachmentMeta::from_value(&json!({"name": "attachments/a", "size": 12})).unwrap();
        assert_eq!(a.size, 12);
        let b = AttachmentMeta::from_value(&json!({"size": "345"})).unwrap();
        assert_eq!(b.size, 345);
        let c = AttachmentMeta::from_value(&json!({"size": "lots"})).unwrap();
        assert_eq!(c.size, 0);
    }

    #[test]
    fn test_attachment_list_shapes() {
        assert!(AttachmentMeta::list_from_value(&Value::Null).unwrap().is_empty());

        let list = AttachmentMeta::list_from_value(&json!([
            {"name": "attachments/a", "filename": "a.png"},
            {"name": "attachments/b", "filename": "b.png"}
        ]))
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].filename, "b.png");

        assert!(AttachmentMeta::list_from_value(&json!("oops")).is_err());
        assert!(AttachmentMeta::list_from_value(&json!([{"name": "x"}, 3])).is_err());
    }

    #[test]
    fn test_attachment_ref_serializes_type_key() {
        let meta = AttachmentMeta::from_value(&json!({
            "name": "attachments/a",
            "filename": "a.png",
            "type": "image/png",
            "size": "3",
            "createTime": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        let r = meta.into_ref("attachments/a.png".into());
        let out = serde_json::to_value(&r).unwrap();
        assert_eq!(out["type"], "image/png");
        assert_eq!(out["id"], "attachments/a");
        assert_eq!(out["size"], 3);
    }

    #[test]
    fn test_report_counts_attachments_on_push() {
        let mut report = ExportReport::new("https://memos.example.com/");
        assert_eq!(report.host, "https://memos.example.com");

        let attachment = AttachmentMeta::from_value(&json!({"name": "attachments/a"}))
            .unwrap()
            .into_ref("attachments/a.png".into());
        let memo = MemoRecord::from_detail(&json!({"name": "memos/1"}), vec![attachment]).unwrap();
        report.push_memo(memo);
        report.push_error("Memo memos/2: boom".into());

        assert_eq!(report.memos.len(), 1);
        assert_eq!(report.summary.total_attachments, 1);
        assert_eq!(report.summary.export_errors.len(), 1);
    }
}
