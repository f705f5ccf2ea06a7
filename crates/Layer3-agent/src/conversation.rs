//! Conversation - 대화 구성과 도구 메시지 캡
//!
//! 도구 출력은 모델 컨텍스트보다 수십 배 클 수 있으므로, tool 역할
//! 메시지는 항상 설정된 길이로 자르고 명시적 마커를 붙입니다.
//! 대화에는 캡이 적용되지 않은 tool 메시지가 존재하지 않습니다.

use driftwood_foundation::Message;

/// 잘림 마커 (고정 문자열)
pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// tool 메시지 content를 캡에 맞게 자름
///
/// 캡 이내면 그대로, 넘으면 `cap`문자 + 마커입니다. 문자 경계
/// 기준으로 자르므로 멀티바이트 문자를 쪼개지 않습니다.
pub fn cap_tool_content(content: &str, cap: usize) -> String {
    if content.chars().count() <= cap {
        return content.to_string();
    }
    let head: String = content.chars().take(cap).collect();
    format!("{}{}", head, TRUNCATION_MARKER)
}

/// 시스템 프롬프트 + 사용자 질문으로 초기 대화 구성
pub fn seed_conversation(system_prompt: Option<&str>, user_input: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    if let Some(prompt) = system_prompt {
        messages.push(Message::system(prompt));
    }
    messages.push(Message::user(user_input));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwood_foundation::Role;

    #[test]
    fn test_cap_under_limit_unchanged() {
        assert_eq!(cap_tool_content("short", 100), "short");
    }

    #[test]
    fn test_cap_over_limit_marked() {
        let long = "a".repeat(150);
        let capped = cap_tool_content(&long, 100);
        assert!(capped.starts_with(&"a".repeat(100)));
        assert!(capped.ends_with(TRUNCATION_MARKER));
        assert_eq!(capped.chars().count(), 100 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_cap_multibyte_safe() {
        let long = "한".repeat(50);
        let capped = cap_tool_content(&long, 10);
        assert!(capped.starts_with(&"한".repeat(10)));
        assert!(capped.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_seed_conversation() {
        let messages = seed_conversation(Some("You are helpful."), "hi");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);

        let bare = seed_conversation(None, "hi");
        assert_eq!(bare.len(), 1);
    }
}
