//! 公共验证函数，供路由层和推荐引擎共用。

pub const MAX_ID_LEN: usize = 64;

/// 标识符：1-64 个字符，仅允许字母、数字、下划线和连字符
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn validate_id(kind: &str, id: &str) -> Result<(), String> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(format!("{kind} 格式无效"))
    }
}

/// 数量参数必须落在 [1, max]
pub fn validate_count(name: &str, value: usize, max: usize) -> Result<(), String> {
    if value == 0 || value > max {
        return Err(format!("{name} 需在1到{max}之间"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ids() {
        assert!(is_valid_id("learner-01"));
        assert!(is_valid_id("a"));
        assert!(is_valid_id("KB_2024"));
        assert!(is_valid_id(&"x".repeat(64)));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"x".repeat(65)));
        assert!(!is_valid_id("kb:1"));
        assert!(!is_valid_id("kb 1"));
        assert!(!is_valid_id("知识库"));
        assert!(validate_id("knowledgeBaseId", "../etc").is_err());
    }

    #[test]
    fn count_bounds() {
        assert!(validate_count("count", 1, 100).is_ok());
        assert!(validate_count("count", 100, 100).is_ok());
        assert!(validate_count("count", 0, 100).is_err());
        assert!(validate_count("count", 101, 100).is_err());
    }
}
