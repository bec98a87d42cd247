use super::model::{suite_key, ReportModel};
use super::types::{TestResult, NOT_AVAILABLE};
use crate::error::{ReportError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML with one `<testsuite>` per suite
pub fn generate_junit_xml(model: &ReportModel) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let summary = &model.overall_summary;
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-reporter"));
    suites_start.push_attribute(("tests", summary.total.to_string().as_str()));
    suites_start.push_attribute(("failures", summary.failed.to_string().as_str()));
    suites_start.push_attribute(("skipped", "0"));
    writer.write_event(Event::Start(suites_start))?;

    let timestamp = &model.aggregate_metadata.execution_start_time;
    for (suite, stats) in &model.suite_stats {
        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", suite.as_str()));
        suite_start.push_attribute(("tests", stats.total.to_string().as_str()));
        suite_start.push_attribute(("failures", stats.failed.to_string().as_str()));
        suite_start.push_attribute(("skipped", "0"));
        if timestamp != NOT_AVAILABLE {
            suite_start.push_attribute(("timestamp", timestamp.as_str()));
        }
        writer.write_event(Event::Start(suite_start))?;

        for result in model
            .merged_results
            .iter()
            .filter(|r| suite_key(r) == suite.as_str())
        {
            write_test_case(&mut writer, suite, result)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &str,
    result: &TestResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.test_name.as_str()));
    case_start.push_attribute(("classname", suite));
    writer.write_event(Event::Start(case_start))?;

    if !result.is_passed() {
        let message = if result.error.is_empty() {
            "Unknown error"
        } else {
            result.error.as_str()
        };
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", message));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;
        if !result.stack.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&result.stack)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    if !result.spec_console_logs.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(
            &result.spec_console_logs.join("\n"),
        )))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write JUnit XML to `output`, or stdout when no path is given
pub async fn generate(model: &ReportModel, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(model)?;

    if let Some(path) = output {
        tokio::fs::write(path, xml)
            .await
            .map_err(|source| ReportError::OutputWrite {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}
