//! 约定规范定义
//!
//! 提供配置路径的命名约定：成员名称按驼峰拆分并以短横线连接

/// 命名约定规范
#[derive(Debug)]
pub struct NamingConventions;

impl NamingConventions {
    /// 将成员名称转换为短横线形式
    ///
    /// `maxRetryCount` → `max-retry-count`，`HTTPPort` → `http-port`，
    /// 下划线同样视为单词分隔符。
    pub fn to_dash_notation(name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let mut result = String::with_capacity(name.len() + 4);

        for (index, &ch) in chars.iter().enumerate() {
            if ch == '_' || ch == '-' {
                if !result.is_empty() && !result.ends_with('-') {
                    result.push('-');
                }
                continue;
            }

            if ch.is_uppercase() && index > 0 {
                let prev = chars[index - 1];
                let next_is_lower = chars.get(index + 1).is_some_and(|c| c.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !result.is_empty() && !result.ends_with('-') {
                    result.push('-');
                }
            }

            result.extend(ch.to_lowercase());
        }

        result.trim_end_matches('-').to_string()
    }

    /// 计算配置键的完整路径
    ///
    /// 显式路径优先，否则使用成员名称的短横线形式；前缀应已带有结尾的 `.`
    pub fn config_path(prefix: &str, member: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(path) if !path.is_empty() => format!("{prefix}{path}"),
            _ => format!("{prefix}{}", Self::to_dash_notation(member)),
        }
    }

    /// 生成嵌套配置节的路径前缀
    pub fn section_prefix(full_path: &str) -> String {
        format!("{full_path}.")
    }
}
