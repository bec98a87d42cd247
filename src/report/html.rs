use super::model::{ReportModel, TrendPoint};
use super::screenshot::embed_screenshot;
use super::types::TestStatus;
use crate::error::ReportError;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Rows per page in the details table
const PAGE_SIZE: usize = 25;

/// Generate HTML dashboard
pub async fn generate(model: &ReportModel, output: Option<&Path>) -> Result<()> {
    let html = render_html(model);

    if let Some(path) = output {
        tokio::fs::write(path, html)
            .await
            .map_err(|source| ReportError::OutputWrite {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("HTML report saved to: {}", path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

/// Render the whole dashboard as one self-contained page
pub fn render_html(model: &ReportModel) -> String {
    let summary = &model.overall_summary;
    let metadata = &model.aggregate_metadata;

    let trend_tab = if model.history_trend.is_some() {
        r#"<button class="tablink" onclick="openTab(event, 'Trends')">Trends</button>"#
    } else {
        ""
    };
    let trend_html = model
        .history_trend
        .as_ref()
        .map(render_trend)
        .unwrap_or_default();
    let trend_data = model
        .history_trend
        .as_ref()
        .map(trend_chart_data)
        .unwrap_or_else(|| "{}".to_string());

    let warnings_html = if model.warnings.is_empty() {
        String::new()
    } else {
        let items: String = model
            .warnings
            .iter()
            .map(|w| format!("<li>{}</li>", html_escape(&w.to_string())))
            .collect();
        let records = match model.skipped_records() {
            0 => String::new(),
            n => format!(", {} records dropped", n),
        };
        format!(
            r#"<div class="warnings"><strong>{} of {} input files were skipped{}</strong><ul>{}</ul></div>"#,
            model.skipped_files(),
            model.input_files,
            records,
            items
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>UI Test Execution Report</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
    <style>
        :root {{
            --bg-primary: #0a0f1d;
            --bg-secondary: #141b2d;
            --bg-tertiary: #1f2937;
            --border: #374151;
            --text-primary: #f9fafb;
            --text-secondary: #9ca3af;
            --green: #10b981;
            --red: #ef4444;
            --blue: #3b82f6;
            --purple: #8b5cf6;
        }}
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: 'Inter', system-ui, -apple-system, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            padding: 2rem 1rem;
        }}
        .container {{ max-width: 1200px; margin: 0 auto; }}
        header {{ margin-bottom: 1.5rem; }}
        h1 {{ font-size: 2.25rem; font-weight: 800; letter-spacing: -0.025em; }}
        h2 {{ font-size: 1.25rem; margin: 2rem 0 1rem; }}
        .execution {{ color: var(--text-secondary); font-size: 0.875rem; margin-top: 0.5rem; }}
        .nav {{ display: flex; gap: 0.5rem; margin-bottom: 2rem; border-bottom: 1px solid var(--border); }}
        .nav button {{
            background: none; border: none; color: var(--text-secondary);
            padding: 0.75rem 1.5rem; font-size: 1rem; cursor: pointer;
        }}
        .nav button.active {{ color: var(--text-primary); border-bottom: 2px solid var(--purple); }}
        .tabcontent {{ display: none; }}
        .summary {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 1.5rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 1.5rem;
            border-radius: 1rem;
            cursor: pointer;
        }}
        .stat-value {{ font-size: 2.5rem; font-weight: 800; }}
        .stat-label {{ color: var(--text-secondary); font-size: 0.875rem; text-transform: uppercase; }}
        .stat.passed .stat-value {{ color: var(--green); }}
        .stat.failed .stat-value {{ color: var(--red); }}
        .chart-container {{ max-width: 360px; margin: 0 auto 2rem; }}
        .progress-bar {{
            background: var(--bg-secondary); height: 12px; border-radius: 6px;
            overflow: hidden; border: 1px solid var(--border); margin-bottom: 2rem;
        }}
        .progress-fill {{ height: 100%; background: linear-gradient(90deg, var(--green), #34d399); }}
        table {{ width: 100%; border-collapse: collapse; background: var(--bg-secondary); margin-bottom: 1rem; }}
        th, td {{ border: 1px solid var(--border); padding: 0.5rem 0.75rem; text-align: left; font-size: 0.875rem; }}
        th {{ background: var(--bg-tertiary); cursor: pointer; user-select: none; }}
        td.passed {{ color: var(--green); font-weight: 600; }}
        td.failed {{ color: var(--red); font-weight: 600; }}
        .filter-group {{ display: flex; gap: 0.75rem; margin-bottom: 1rem; flex-wrap: wrap; }}
        .filter-group input, .filter-group select, button.action {{
            background: var(--bg-secondary); color: var(--text-primary);
            border: 1px solid var(--border); border-radius: 0.5rem; padding: 0.5rem 0.75rem;
        }}
        button.action {{ cursor: pointer; }}
        .pagination {{ display: flex; gap: 0.5rem; align-items: center; color: var(--text-secondary); }}
        .thumbnail {{ max-width: 100px; cursor: pointer; border-radius: 0.25rem; }}
        .warnings {{
            background: rgba(239, 68, 68, 0.1); border: 1px solid rgba(239, 68, 68, 0.3);
            border-radius: 0.75rem; padding: 1rem; margin-bottom: 2rem; font-size: 0.875rem;
        }}
        .warnings ul {{ margin-left: 1.25rem; }}
        .issues {{ font-size: 0.8125rem; color: var(--text-secondary); }}
        #modal {{
            display: none; position: fixed; z-index: 100; top: 0; left: 0;
            width: 100%; height: 100%; background: rgba(0, 0, 0, 0.9);
            padding: 2rem; align-items: center; justify-content: center;
        }}
        #modal img {{ max-width: 100%; max-height: 100%; border-radius: 0.5rem; }}
        #modal.active {{ display: flex; }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>UI Test Execution Report</h1>
            <div class="execution">Browser: {browser} · Start: {start} · End: {end} · Total Execution Time (minutes): {minutes}</div>
        </header>
        {warnings_html}
        <div class="nav">
            <button class="tablink active" onclick="openTab(event, 'Dashboard')">Dashboard</button>
            <button class="tablink" onclick="openTab(event, 'TestDetails')">Test Details</button>
            {trend_tab}
        </div>

        <div id="Dashboard" class="tabcontent" style="display: block;">
            <div class="summary">
                <div class="stat" onclick="showDetails('')"><div class="stat-value">{total}</div><div class="stat-label">Total Tests</div></div>
                <div class="stat passed" onclick="showDetails('PASSED')"><div class="stat-value">{passed}</div><div class="stat-label">Passed</div></div>
                <div class="stat failed" onclick="showDetails('FAILED')"><div class="stat-value">{failed}</div><div class="stat-label">Failed</div></div>
            </div>
            <div style="display: flex; justify-content: space-between; margin-bottom: 0.75rem;">
                <span>Success Rate</span><span style="color: var(--green); font-weight: 700;">{pass_rate}%</span>
            </div>
            <div class="progress-bar"><div class="progress-fill" style="width: {pass_rate}%"></div></div>
            <div class="chart-container"><canvas id="statusChart"></canvas></div>
            <h2>Suites</h2>
            {suites_html}
            <h2>Unique Errors</h2>
            {errors_html}
        </div>

        <div id="TestDetails" class="tabcontent">
            <div class="filter-group">
                <input type="text" id="filterSuite" placeholder="Filter by Suite Name..." onkeyup="applyFilters()">
                <input type="text" id="filterTest" placeholder="Filter by Test Name..." onkeyup="applyFilters()">
                <select id="filterStatus" onchange="applyFilters()">
                    <option value="">All statuses</option>
                    <option value="PASSED">PASSED</option>
                    <option value="FAILED">FAILED</option>
                </select>
                <button class="action" onclick="clearFilters()">Clear Filters</button>
                <button class="action" onclick="exportTableToExcel('detailsTable', 'TestDetailsReport')">Export to Excel</button>
            </div>
            {details_html}
            <div class="pagination">
                <button class="action" onclick="changePage(-1)">Previous</button>
                <span id="pageInfo"></span>
                <button class="action" onclick="changePage(1)">Next</button>
            </div>
        </div>

        {trend_html}
    </div>

    <div id="modal" onclick="this.classList.remove('active')">
        <img id="modal-img" src="" alt="Screenshot">
    </div>

    <script>
        const PAGE_SIZE = {page_size};
        const TREND = {trend_data};
        let currentPage = 0;

        function openTab(evt, name) {{
            document.querySelectorAll('.tabcontent').forEach(t => t.style.display = 'none');
            document.querySelectorAll('.tablink').forEach(b => b.classList.remove('active'));
            document.getElementById(name).style.display = 'block';
            if (evt) evt.currentTarget.classList.add('active');
            if (name === 'Trends') drawTrends();
        }}

        function showDetails(status) {{
            document.getElementById('filterStatus').value = status;
            applyFilters();
            openTab(null, 'TestDetails');
            document.querySelectorAll('.tablink')[1].classList.add('active');
        }}

        function rows() {{
            return Array.from(document.querySelectorAll('#detailsTable tbody tr'));
        }}

        function matches(row) {{
            const suite = document.getElementById('filterSuite').value.toLowerCase();
            const test = document.getElementById('filterTest').value.toLowerCase();
            const status = document.getElementById('filterStatus').value;
            const cells = row.cells;
            return cells[1].textContent.toLowerCase().includes(suite)
                && cells[2].textContent.toLowerCase().includes(test)
                && (!status || cells[3].textContent === status);
        }}

        function render() {{
            const visible = rows().filter(matches);
            const pages = Math.max(1, Math.ceil(visible.length / PAGE_SIZE));
            currentPage = Math.min(currentPage, pages - 1);
            rows().forEach(r => r.style.display = 'none');
            visible.slice(currentPage * PAGE_SIZE, (currentPage + 1) * PAGE_SIZE)
                .forEach(r => r.style.display = '');
            document.getElementById('pageInfo').textContent =
                'Page ' + (currentPage + 1) + ' of ' + pages + ' (' + visible.length + ' tests)';
        }}

        function applyFilters() {{ currentPage = 0; render(); }}

        function changePage(delta) {{ currentPage = Math.max(0, currentPage + delta); render(); }}

        function clearFilters() {{
            ['filterSuite', 'filterTest', 'filterStatus'].forEach(id => document.getElementById(id).value = '');
            applyFilters();
        }}

        function sortTable(col, header) {{
            const tbody = document.querySelector('#detailsTable tbody');
            const asc = header.dataset.order !== 'asc';
            header.dataset.order = asc ? 'asc' : 'desc';
            rows().sort((a, b) => {{
                const x = a.cells[col].textContent, y = b.cells[col].textContent;
                return asc ? x.localeCompare(y) : y.localeCompare(x);
            }}).forEach(r => tbody.appendChild(r));
            render();
        }}

        function exportTableToExcel(tableId, filename) {{
            const table = document.getElementById(tableId).cloneNode(true);
            table.querySelectorAll('tr').forEach(r => r.style.display = '');
            table.querySelectorAll('img').forEach(img => img.replaceWith('screenshot'));
            const html = '<html><head><meta charset="UTF-8"></head><body>' + table.outerHTML + '</body></html>';
            const link = document.createElement('a');
            link.href = 'data:application/vnd.ms-excel;charset=utf-8,' + encodeURIComponent(html);
            link.download = filename + '.xls';
            link.click();
        }}

        function showScreenshot(src) {{
            document.getElementById('modal-img').src = src;
            document.getElementById('modal').classList.add('active');
        }}

        function drawTrends() {{
            Object.keys(TREND).forEach((suite, i) => {{
                const canvas = document.getElementById('trend-' + i);
                if (!canvas || canvas.dataset.drawn || typeof Chart === 'undefined') return;
                canvas.dataset.drawn = '1';
                new Chart(canvas, {{
                    type: 'line',
                    data: {{
                        labels: TREND[suite].labels,
                        datasets: [
                            {{ label: 'Pass rate %', data: TREND[suite].passRate, borderColor: '#10b981' }},
                            {{ label: 'Fail rate %', data: TREND[suite].failRate, borderColor: '#ef4444' }}
                        ]
                    }},
                    options: {{ scales: {{ y: {{ min: 0, max: 100 }} }} }}
                }});
            }});
        }}

        document.addEventListener('DOMContentLoaded', () => {{
            render();
            if (typeof Chart !== 'undefined') {{
                new Chart(document.getElementById('statusChart'), {{
                    type: 'doughnut',
                    data: {{
                        labels: ['Passed', 'Failed'],
                        datasets: [{{ data: [{passed}, {failed}], backgroundColor: ['#10b981', '#ef4444'] }}]
                    }}
                }});
            }}
        }});
    </script>
</body>
</html>"#,
        browser = html_escape(&metadata.browser_name),
        start = html_escape(&metadata.execution_start_time),
        end = html_escape(&metadata.execution_end_time),
        minutes = html_escape(&metadata.total_time_in_minutes),
        warnings_html = warnings_html,
        trend_tab = trend_tab,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        pass_rate = summary.pass_rate,
        suites_html = render_suites(model),
        errors_html = render_errors(model),
        details_html = render_details(model),
        trend_html = trend_html,
        page_size = PAGE_SIZE,
        trend_data = trend_data,
    )
}

fn render_suites(model: &ReportModel) -> String {
    if model.suite_stats.is_empty() {
        return "<p>No results.</p>".to_string();
    }
    let rows: String = model
        .suite_stats
        .iter()
        .map(|(suite, stats)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(suite),
                stats.total,
                stats.passed,
                stats.failed
            )
        })
        .collect();
    format!(
        "<table id=\"suiteTable\"><thead><tr><th>Suite</th><th>Total</th><th>Passed</th><th>Failed</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn render_errors(model: &ReportModel) -> String {
    if model.unique_errors.is_empty() {
        return "<p>No errors.</p>".to_string();
    }
    let rows: String = model
        .unique_errors
        .iter()
        .map(|e| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                html_escape(&e.error),
                e.count
            )
        })
        .collect();
    format!(
        "<table id=\"errorTable\"><thead><tr><th>Error</th><th>Occurrences</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn render_details(model: &ReportModel) -> String {
    let headers = ["Timestamp", "Suite Name", "Test Name", "Status", "Error"];
    let header_html: String = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("<th onclick=\"sortTable({}, this)\">{}</th>", i, h))
        .collect();

    let mut rows = String::new();
    for result in &model.merged_results {
        let status_class = match result.status {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        };
        let screenshot_html = match embed_screenshot(&result.screenshot) {
            Some(data_url) => format!(
                r#"<img src="{}" class="thumbnail" alt="Screenshot for {}" onclick="showScreenshot(this.src)">"#,
                data_url,
                html_escape(&result.test_name)
            ),
            None => "No Screenshot".to_string(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&result.timestamp),
            html_escape(&result.suite_name),
            html_escape(&result.test_name),
            status_class,
            result.status,
            html_escape(&result.error),
            screenshot_html
        ));
    }

    format!(
        "<table id=\"detailsTable\"><thead><tr>{}<th>Screenshot</th></tr></thead><tbody>\n{}</tbody></table>",
        header_html, rows
    )
}

fn render_trend(trend: &BTreeMap<String, Vec<TrendPoint>>) -> String {
    let mut sections = String::new();
    for (i, (suite, points)) in trend.iter().enumerate() {
        let rows: String = points
            .iter()
            .map(|p| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}%</td><td>{}%</td><td class=\"issues\">{}</td><td class=\"issues\">{}</td></tr>",
                    html_escape(&p.timestamp),
                    p.total_tests,
                    p.passed,
                    p.failed,
                    p.pass_rate,
                    p.fail_rate,
                    html_escape(&p.new_issues.join(", ")),
                    html_escape(&p.resolved_issues.join(", "))
                )
            })
            .collect();
        sections.push_str(&format!(
            r#"<h2>{suite}</h2>
            <div class="chart-container" style="max-width: 720px;"><canvas id="trend-{i}"></canvas></div>
            <table><thead><tr><th>Timestamp</th><th>Total</th><th>Passed</th><th>Failed</th><th>Pass Rate</th><th>Fail Rate</th><th>New Issues</th><th>Resolved Issues</th></tr></thead><tbody>{rows}</tbody></table>
"#,
            suite = html_escape(suite),
            i = i,
            rows = rows
        ));
    }
    format!(r#"<div id="Trends" class="tabcontent">{}</div>"#, sections)
}

/// Chart series per suite, embedded as a JS object literal
fn trend_chart_data(trend: &BTreeMap<String, Vec<TrendPoint>>) -> String {
    let data: serde_json::Map<String, serde_json::Value> = trend
        .iter()
        .map(|(suite, points)| {
            let series = serde_json::json!({
                "labels": points.iter().map(|p| p.timestamp.as_str()).collect::<Vec<_>>(),
                "passRate": points.iter().map(|p| p.pass_rate).collect::<Vec<_>>(),
                "failRate": points.iter().map(|p| p.fail_rate).collect::<Vec<_>>(),
            });
            (suite.clone(), series)
        })
        .collect();
    // keep "</script>" inside string values from closing the script block
    serde_json::Value::Object(data)
        .to_string()
        .replace("</", "<\\/")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregator::{LoadedDocument, LoadedInputs, ResultAggregator};
    use crate::report::history::{HistoryEntry, SuiteSnapshot};
    use crate::report::model::PartialInputWarning;
    use std::path::PathBuf;

    fn model(history: bool) -> ReportModel {
        let document = serde_json::from_str(
            r#"{
                "metadata": {"browserName": "chrome", "executionStartTime": "2024-01-01T00:00:00Z", "executionEndTime": "2024-01-01T00:10:00Z"},
                "testResults": [
                    {"suiteName": "Login", "testName": "valid <user>", "status": "PASSED"},
                    {"suiteName": "Login", "testName": "bad password", "status": "FAILED", "error": "expected \"ok\" & got <error>"}
                ]
            }"#,
        )
        .unwrap();
        let mut aggregator = ResultAggregator::new();
        if history {
            aggregator = aggregator.with_history(vec![HistoryEntry {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                suites: BTreeMap::from([(
                    "Login</script>".to_string(),
                    SuiteSnapshot {
                        total_tests: 2,
                        passed: 1,
                        failed: 1,
                        defect_comparison: None,
                    },
                )]),
            }]);
        }
        aggregator.aggregate(LoadedInputs {
            documents: vec![LoadedDocument {
                path: PathBuf::from("run.json"),
                document,
            }],
            warnings: vec![
                PartialInputWarning::file(Path::new("broken.json"), "not a result document".to_string()),
                PartialInputWarning::record(Path::new("run.json"), 2, "unknown status".to_string()),
            ],
            files_seen: 2,
        })
    }

    #[test]
    fn test_dashboard_content() {
        let html = render_html(&model(false));

        assert!(html.contains("Browser: chrome"));
        assert!(html.contains("Total Execution Time (minutes): 10.00"));
        assert!(html.contains(r#"<div class="stat-value">2</div><div class="stat-label">Total Tests</div>"#));
        assert!(html.contains("width: 50%"));
        assert!(html.contains("1 of 2 input files were skipped, 1 records dropped"));
        assert!(html.contains("run.json record 2: unknown status"));
        assert!(html.contains("No Screenshot"));
        assert!(!html.contains(r#"id="Trends""#));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let html = render_html(&model(false));

        assert!(html.contains("valid &lt;user&gt;"));
        assert!(html.contains("expected &quot;ok&quot; &amp; got &lt;error&gt;"));
        assert!(!html.contains("<user>"));
    }

    #[test]
    fn test_trend_section() {
        let html = render_html(&model(true));

        assert!(html.contains(r#"id="Trends""#));
        assert!(html.contains("Login&lt;/script&gt;"));
        assert!(html.contains(r#"Login<\/script>"#));
        assert!(html.contains("<td>50%</td>"));
    }
}
