use crate::core::runner::ToolOutput;

/// Last line worth showing an operator: prefers the last error line, falls
/// back to the last non-empty line.
pub fn last_meaningful_line(lines: &[String]) -> Option<String> {
    if let Some(err) = lines
        .iter()
        .rev()
        .find(|l| l.contains("ERROR") || l.contains("error:"))
    {
        return Some(err.trim().to_string());
    }
    lines
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Condense a captured command result into a one-line failure reason.
pub fn summarize_output(output: &ToolOutput) -> String {
    let lines: Vec<String> = output
        .stdout
        .lines()
        .chain(output.stderr.lines())
        .map(str::to_string)
        .collect();
    let code = output
        .status
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    match last_meaningful_line(&lines) {
        Some(line) => format!("exit code {code}: {line}"),
        None => format!("exit code {code}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_prefers_error_lines() {
        let captured = lines(&[
            "[download] Destination: a.mp4",
            "ERROR: unable to download video data",
            "[download] cleaning up",
        ]);
        assert_eq!(
            last_meaningful_line(&captured).unwrap(),
            "ERROR: unable to download video data"
        );
    }

    #[test]
    fn test_falls_back_to_last_nonempty() {
        let captured = lines(&["first", "second", "   "]);
        assert_eq!(last_meaningful_line(&captured).unwrap(), "second");
    }

    #[test]
    fn test_empty_output_has_no_line() {
        assert_eq!(last_meaningful_line(&[]), None);
        assert_eq!(last_meaningful_line(&lines(&["", "  "])), None);
    }

    #[test]
    fn test_summarize_includes_exit_code() {
        let output = ToolOutput {
            status: Some(100),
            stdout: String::new(),
            stderr: "E: Unable to locate package ffmpeg\n".to_string(),
        };
        let summary = summarize_output(&output);
        assert!(summary.contains("exit code 100"));
        assert!(summary.contains("Unable to locate package"));
    }
}
