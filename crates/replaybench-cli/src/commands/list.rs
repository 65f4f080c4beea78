// Benchmark listing command

use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use replaybench_core::BenchmarkConfig;
use serde::Serialize;

/// One benchmark name and what it expands to
#[derive(Debug, Serialize)]
pub struct BenchmarkInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn collect(config: &BenchmarkConfig) -> Vec<BenchmarkInfo> {
    config
        .url_spec
        .names()
        .map(|name| match config.url_spec.resolve(name) {
            Ok(urls) => BenchmarkInfo {
                name: name.to_string(),
                urls: Some(urls.len()),
                error: None,
            },
            Err(e) => BenchmarkInfo {
                name: name.to_string(),
                urls: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

pub fn run(config: &BenchmarkConfig, output: OutputFormat) -> Result<()> {
    let benchmarks = collect(config);

    if !output.is_text() {
        return output.print_value(&benchmarks);
    }

    if benchmarks.is_empty() {
        println!("No benchmarks defined");
        return Ok(());
    }

    print_table_header(&[("NAME", 24), ("URLS", 6), ("ERROR", 40)]);
    for info in &benchmarks {
        let urls = info.urls.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        print_table_row(&[
            (&info.name, 24),
            (&urls, 6),
            (info.error.as_deref().unwrap_or(""), 40),
        ]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaybench_core::{RequestDescriptor, SpecEntry, UrlSpec};

    #[test]
    fn test_collect_reports_sizes_and_errors() {
        let spec = UrlSpec::new()
            .with("home", SpecEntry::Single(RequestDescriptor::new("/")))
            .with("both", SpecEntry::Alias("home, home".into()))
            .with("loop", SpecEntry::Alias("loop".into()))
            .with("dangling", SpecEntry::Alias("missing".into()));

        let infos = collect(&BenchmarkConfig::new(spec));
        let by_name = |n: &str| infos.iter().find(|i| i.name == n).unwrap();

        assert_eq!(by_name("home").urls, Some(1));
        assert_eq!(by_name("both").urls, Some(2));
        assert!(by_name("loop").error.as_deref().unwrap().starts_with("Cyclic url spec"));
        assert_eq!(
            by_name("dangling").error.as_deref(),
            Some("There is no benchmark named 'missing'")
        );
    }
}
