use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn author(&self) -> &'static str {
        match self {
            Sender::User => "👨‍🌾 You",
            Sender::Bot => "🤖 Kalpataru",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Sender::User => "👤",
            Sender::Bot => "🤖",
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Message {
        Message {
            sender,
            text: text.into(),
        }
    }

    /// One line of the history list, e.g. `👤 hello`.
    pub fn history_line(&self) -> String {
        format!("{} {}", self.sender.icon(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let msg = Message::new(Sender::Bot, "hi there");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"sender":"bot","text":"hi there"}"#);

        let back: Message = serde_json::from_str(r#"{"sender":"user","text":""}"#).unwrap();
        assert_eq!(back, Message::new(Sender::User, ""));
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let res = serde_json::from_str::<Message>(r#"{"sender":"system","text":"x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_history_line() {
        assert_eq!(Message::new(Sender::User, "hello").history_line(), "👤 hello");
        assert_eq!(Message::new(Sender::Bot, "hi").history_line(), "🤖 hi");
        assert_eq!(Sender::User.author(), "👨‍🌾 You");
    }
}
