use ember_ids::UserId;
use ember_repo::UserRepository;

/// `@username` grammar: `@` followed by one or more ASCII alphanumerics,
/// underscore or hyphen. Deduplicated; case-sensitive (usernames are
/// stored case-sensitively).
pub fn parse_usernames(content: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'@' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && is_username_char(bytes[end]) {
                end += 1;
            }
            if end > start {
                let name = &content[start..end];
                if !names.contains(&name) {
                    names.push(name);
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    names
}

fn is_username_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Resolves parsed `@username` mentions to user ids, silently dropping any
/// that don't resolve to an existing account.
pub async fn resolve(users: &dyn UserRepository, content: &str) -> Vec<UserId> {
    let mut ids = Vec::new();
    for name in parse_usernames(content) {
        if let Ok(user) = users.get_by_username(name).await {
            ids.push(user.id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_distinct_usernames() {
        let names = parse_usernames("hey @alice and @bob, also @alice again");
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn bare_at_sign_is_not_a_mention() {
        assert!(parse_usernames("say @ loud").is_empty());
    }

    #[test]
    fn punctuation_terminates_the_username() {
        let names = parse_usernames("ping @carol!");
        assert_eq!(names, vec!["carol"]);
    }
}
