use crate::git::Commit;

/// 按作者、提交消息或哈希过滤提交（大小写不敏感的子串匹配）
///
/// 保持原有顺序；空查询返回完整列表。
pub fn filter_commits(commits: &[Commit], query: &str) -> Vec<Commit> {
    if query.is_empty() {
        return commits.to_vec();
    }

    let needle = query.to_lowercase();
    commits
        .iter()
        .filter(|commit| commit.matches_lowercase(&needle))
        .cloned()
        .collect()
}
