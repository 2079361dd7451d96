//! Glob matching for protected-pattern checks, ported from the teacher's
//! `models/security.rs` `CommandPattern` matcher (`*`/`?` wildcards via a
//! dynamic-programming match table).

pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    let p_len = pattern_chars.len();
    let t_len = text_chars.len();

    let mut dp = vec![vec![false; t_len + 1]; p_len + 1];
    dp[0][0] = true;

    for i in 0..p_len {
        if pattern_chars[i] == '*' {
            dp[i + 1][0] = dp[i][0];
        } else {
            break;
        }
    }

    for i in 0..p_len {
        let p_ch = pattern_chars[i];
        for j in 0..t_len {
            let t_ch = text_chars[j];
            if p_ch == '*' {
                dp[i + 1][j + 1] = dp[i][j + 1] || dp[i + 1][j];
            } else if p_ch == '?' || p_ch == t_ch {
                dp[i + 1][j + 1] = dp[i][j];
            }
        }
        if p_ch == '*' {
            dp[i + 1][t_len] = dp[i][t_len] || dp[i + 1][t_len];
        }
    }

    dp[p_len][t_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(glob_match("server.pem", "server.pem"));
        assert!(!glob_match("server.pem", "server.key"));
    }

    #[test]
    fn test_star_suffix() {
        assert!(glob_match("*.pem", "server.pem"));
        assert!(!glob_match("*.pem", "server.pemx"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("id_rsa.?ub", "id_rsa.pub"));
    }
}
