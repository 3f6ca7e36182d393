//! Console and JUnit XML reporters.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;

use crate::runner::{CaseStatus, SuiteResult};

/// Plain-text summary, one line per case.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn render(&self, result: &SuiteResult) -> String {
        let mut out = format!("Suite: {}\n", result.suite);
        for case in &result.cases {
            let _ = writeln!(out, " - {}: {}", case.id, case.status());
        }
        out
    }

    pub fn emit(&self, result: &SuiteResult) {
        print!("{}", self.render(result));
    }
}

/// JUnit XML for CI dashboards.
#[derive(Debug, Default)]
pub struct JUnitReporter;

impl JUnitReporter {
    pub fn render(&self, result: &SuiteResult) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\">",
            xml_escape(&result.suite),
            result.cases.len(),
            result.failed(),
            result.skipped(),
        );
        for case in &result.cases {
            let name = xml_escape(&case.id);
            match case.status() {
                CaseStatus::Pass => {
                    let _ = writeln!(out, "  <testcase name=\"{name}\"/>");
                }
                CaseStatus::Fail => {
                    let _ = writeln!(
                        out,
                        "  <testcase name=\"{name}\">\n    <failure message=\"failed\">{}</failure>\n  </testcase>",
                        xml_escape(&case.logs.join("\n"))
                    );
                }
                CaseStatus::Skip => {
                    let _ = writeln!(
                        out,
                        "  <testcase name=\"{name}\">\n    <skipped/>\n  </testcase>"
                    );
                }
            }
        }
        out.push_str("</testsuite>\n");
        out
    }

    pub fn write(&self, result: &SuiteResult, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(path, self.render(result))
            .with_context(|| format!("writing JUnit report {}", path.display()))
    }
}

/// Escape text for XML content and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TestCaseResult;

    fn sample() -> SuiteResult {
        let mut ok = TestCaseResult::new("lpf_sweep.s21");
        ok.passed = 1;
        let mut bad = TestCaseResult::new("burn_in.2h");
        bad.fail("Error: pgxl <timeout>");
        bad.log("second line");
        let mut skip = TestCaseResult::new("gain.per_band");
        skip.skip("no radio");
        SuiteResult {
            suite: "acceptance".into(),
            cases: vec![ok, bad, skip],
        }
    }

    #[test]
    fn console_lines() {
        assert_eq!(
            ConsoleReporter.render(&sample()),
            "Suite: acceptance\n - lpf_sweep.s21: PASS\n - burn_in.2h: FAIL\n - gain.per_band: SKIP\n"
        );
    }

    #[test]
    fn junit_document() {
        let xml = JUnitReporter.render(&sample());
        assert!(xml.contains(
            "<testsuite name=\"acceptance\" tests=\"3\" failures=\"1\" skipped=\"1\">"
        ));
        assert!(xml.contains("<testcase name=\"lpf_sweep.s21\"/>"));
        assert!(xml.contains(
            "<failure message=\"failed\">Error: pgxl &lt;timeout&gt;\nsecond line</failure>"
        ));
        assert!(xml.contains("<skipped/>"));
        assert!(xml.trim_end().ends_with("</testsuite>"));
    }

    #[test]
    fn escaping() {
        assert_eq!(xml_escape("a&b \"c\" 'd'"), "a&amp;b &quot;c&quot; &apos;d&apos;");
    }

    #[test]
    fn junit_file_is_written() {
        let dir = std::env::temp_dir().join(format!("pgxl-junit-{}", std::process::id()));
        let path = dir.join("reports").join("junit.xml");
        JUnitReporter.write(&sample(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<testsuite"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
