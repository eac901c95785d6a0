use std::io::{self, BufRead, Write};

use crate::workspace::PickItem;

/// 命令行单选提示
///
/// 输入序号选择，空行或 q 取消。
pub fn pick_from_list(placeholder: &str, items: &[PickItem]) -> anyhow::Result<Option<usize>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    pick_with_io(placeholder, items, &mut stdin.lock(), &mut stdout.lock())
}

pub fn pick_with_io<R: BufRead, W: Write>(
    placeholder: &str,
    items: &[PickItem],
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<Option<usize>> {
    if items.is_empty() {
        return Ok(None);
    }

    writeln!(output, "{}", placeholder)?;
    for (idx, item) in items.iter().enumerate() {
        writeln!(output, "  {}) {}  {}", idx + 1, item.label, item.description)?;
    }

    loop {
        write!(output, "选择 [1-{}] (回车取消): ", items.len())?;
        output.flush()?;

        let mut line = String::new();
        // EOF 视为取消
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();

        if line.is_empty() || line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        match line.parse::<usize>() {
            Ok(n) if (1..=items.len()).contains(&n) => return Ok(Some(n - 1)),
            _ => {
                writeln!(output, "请输入 1 到 {} 之间的数字", items.len())?;
            }
        }
    }
}
