//! 限定名（qualified name）组合。
//!
//! 限定名由若干非空名称段按协议分隔符拼接而成，空段被忽略；
//! 分隔符可以为空串（扁平地址空间，例如寄存器）。

/// 按分隔符拼接所有非空名称段；没有非空段时返回空串。
pub fn compose_qname(separator: &str, names: &[&str]) -> String {
    let mut result = String::new();
    for name in names.iter().filter(|name| !name.is_empty()) {
        if !result.is_empty() {
            result.push_str(separator);
        }
        result.push_str(name);
    }
    result
}

/// 以实例前缀 `top` 开头的限定名。
///
/// 名称段组合为空时结果为空串（不返回孤立的前缀）；`top` 为空时等同于
/// [`compose_qname`]。
pub fn compose_iqname(top: &str, separator: &str, names: &[&str]) -> String {
    let name = compose_qname(separator, names);
    if name.is_empty() || top.is_empty() {
        name
    } else {
        format!("{}{}{}", top, separator, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_empty_segments() {
        assert_eq!(compose_qname("/", &["", "a", "", "b", "c"]), "a/b/c");
        assert_eq!(compose_qname("/", &["", ""]), "");
    }

    #[test]
    fn empty_separator_concatenates() {
        assert_eq!(compose_qname("", &["reg", "10"]), "reg10");
    }
}
