// Main CLI entry point for csrf-audit
// Uses clap for argument parsing; runs the six audit phases in order

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use csrf_audit::config::{parse_headers, AuditConfig};
use csrf_audit::corpus::{analyze_corpus, extract_seeds, hash_hints, ReplayReport};
use csrf_audit::crawler::Crawler;
use csrf_audit::differential::{probe_default, DifferentialTester, Freshness};
use csrf_audit::engine::HttpTransport;
use csrf_audit::evaluate::{evaluate, select_form, Evaluation};
use csrf_audit::models::{BypassVerdict, Page};
use csrf_audit::randomness::run_randomness_battery;
use csrf_audit::reporting::{export_csv, export_markdown, ReportRow};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

fn row(phase: &str, subject: impl Into<String>, result: impl Into<String>) -> ReportRow {
    (phase.to_string(), subject.into(), result.into())
}

fn phase_banner(name: &str, index: usize) {
    println!("\n=== Phase: {} [{}/6] ===", name, index);
}

fn config_from_matches(matches: &ArgMatches) -> Result<AuditConfig> {
    let target = matches
        .get_one::<String>("url")
        .context("target URL is required")?;
    let mut config = AuditConfig::new(target.as_str());
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = (*threads).max(1);
    }
    if let Some(level) = matches.get_one::<usize>("level") {
        config.depth = *level;
    }
    if let Some(delay) = matches.get_one::<u64>("delay") {
        config.delay = Duration::from_secs(*delay);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = Duration::from_secs(*timeout);
    }
    if let Some(raw) = matches.get_one::<String>("headers") {
        config.headers.extend(parse_headers(&raw.replace("\\n", "\n")));
    }
    Ok(config)
}

fn report_evaluation(eval: &Evaluation, target: &str, report: &mut Vec<ReportRow>) {
    if !eval.weak_tokens.is_empty() {
        println!("[+] Weak token(s) found");
        for weak in &eval.weak_tokens {
            println!("    {} {}={}", weak.url, weak.name, weak.value);
            report.push(row("Evaluating", &weak.url, format!("weak token {}={}", weak.name, weak.value)));
        }
    }
    if !eval.insecure_forms.is_empty() {
        println!("[+] Insecure form(s) found");
        for insecure in &eval.insecure_forms {
            let form = insecure.form.action.replace(target, "");
            if !form.is_empty() {
                println!("    {} [{}]", insecure.url, form);
            }
            report.push(row("Evaluating", &insecure.url, format!("no CSRF token in form {}", insecure.form.action)));
        }
    }
}

/// Returns false when the corpus holds nothing worth testing.
fn compare(eval: &Evaluation, report: &mut Vec<ReportRow>) -> bool {
    let analysis = analyze_corpus(&eval.token_database);

    match &analysis.replay {
        ReplayReport::NoDuplicates => {}
        ReplayReport::Confirmed(pairs) => {
            println!("[+] Potential replay attack condition found");
            for pair in pairs {
                println!("[+] The same token was used on {} and {}", pair.first_url, pair.second_url);
                report.push(row(
                    "Comparing",
                    format!("{} / {}", pair.first_url, pair.second_url),
                    "token replayed across URLs",
                ));
            }
        }
        ReplayReport::FalsePositive => {
            println!("[-] Duplicate tokens only appear on revisits of the same URL; not a replay");
        }
    }

    let Some(first) = eval.all_tokens.first() else {
        println!("[-] No CSRF protection to test");
        report.push(row("Comparing", "corpus", "no CSRF tokens found"));
        return false;
    };

    let hints = hash_hints(&first.value);
    if !hints.is_empty() {
        println!("[*] Token from {} matches the pattern of the following hash type(s):", first.url);
        for name in &hints {
            println!("    > {}", name);
        }
        report.push(row("Comparing", first.value.as_str(), format!("hash shape: {}", hints.join(", "))));
    }

    match &analysis.mean_similarity {
        Ok(similarity) => {
            println!("[*] Tokens are {:.0}% similar to each other on average", similarity);
            report.push(row("Comparing", "corpus", format!("{:.0}% mean similarity", similarity)));
        }
        Err(e) => println!("[-] {}", e),
    }

    if !analysis.substring_groups.is_empty() {
        println!("[*] Common substring found");
        match serde_json::to_string_pretty(&analysis.substring_groups) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("Could not render substring groups: {}", e),
        }
        for (substring, tokens) in &analysis.substring_groups {
            report.push(row("Comparing", substring.as_str(), format!("shared by {} token(s)", tokens.len())));
        }
    }
    true
}

async fn observe(transport: &HttpTransport, config: &AuditConfig, eval: &Evaluation, report: &mut Vec<ReportRow>) {
    let Some(record) = eval.token_database.first_protected() else {
        println!("[-] No page with a token to observe");
        return;
    };
    println!("[*] 30 simultaneous requests are being made, please wait.");
    match probe_default(transport, &record.url, &config.headers).await {
        Freshness::Pooled { repeated } => {
            println!("[+] Same tokens were issued for simultaneous requests");
            for token in &repeated {
                println!("    {}", token);
            }
            report.push(row("Observing", &record.url, "tokens reused across simultaneous requests"));
        }
        Freshness::Fresh { observed } => {
            println!("[-] Different tokens were issued for simultaneous requests ({} seen)", observed);
            report.push(row("Observing", &record.url, "fresh token per request"));
        }
        Freshness::NoTokens => {
            println!("[-] No strong tokens came back from simultaneous requests");
        }
    }
}

async fn test_form(
    transport: &HttpTransport,
    config: &AuditConfig,
    pages: &[Page],
    eval: &Evaluation,
    report: &mut Vec<ReportRow>,
) {
    println!("[*] Finding a suitable form for further testing");
    let Some(form) = select_form(pages, true) else {
        println!("[-] No suitable form found for testing");
        report.push(row("Testing", "forms", "no suitable form"));
        return;
    };
    println!("[*] Testing {} {}", if form.use_get { "GET" } else { "POST" }, form.action);

    let seeds = extract_seeds(&eval.all_tokens);
    let tester = DifferentialTester::new(transport, &config.headers, seeds).with_delay(config.delay_ms());
    let mut rng = StdRng::from_entropy();

    let outcome = match tester.run(&form, &mut rng).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("[-] Could not establish a baseline: {}", e);
            report.push(row("Testing", &form.action, format!("baseline failed: {}", e)));
            return;
        }
    };

    println!("[*] Status code: {}", outcome.baseline.status_code);
    println!("[*] Content length: {}", outcome.baseline.content_length);
    if outcome.baseline.is_dynamic() {
        println!("[*] Response is dynamic (tolerance {} bytes)", outcome.baseline.tolerance_window);
    } else {
        println!("[*] Response isn't dynamic");
    }

    for result in &outcome.results {
        let marker = match result.verdict {
            BypassVerdict::BypassSucceeded => "[+]",
            BypassVerdict::ProtectionHeld => "[-]",
            BypassVerdict::Inconclusive => "[?]",
        };
        println!("{} {}: {}", marker, result.strategy, result.verdict);
        report.push(row("Testing", format!("{} {}", form.action, result.strategy), result.verdict.to_string()));
    }
    for unchecked in outcome.unchecked_trailing() {
        println!("[+] Last {} chars of token aren't being checked", unchecked);
        report.push(row("Testing", &form.action, format!("last {} chars unchecked", unchecked)));
    }
}

fn analyse(eval: &Evaluation, report: &mut Vec<ReportRow>) {
    let verdicts = run_randomness_battery(&eval.all_tokens);
    if verdicts.is_empty() {
        println!("[-] Not enough token data for the randomness tests");
        return;
    }
    for (name, random) in &verdicts {
        let label = if *random { "random" } else { "non-random" };
        println!("{} {} : {}", if *random { "[-]" } else { "[+]" }, name, label);
        report.push(row("Analysing", name.as_str(), label));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("csrf-audit")
        .version(clap::crate_version!())
        .author("Jake Abendroth")
        .about("CSRF token security auditor")
        .after_help("EXAMPLES:\n  csrf-audit -u https://target.test/\n  csrf-audit -u https://target.test/ -l 3 -t 8 --delay 1 --headers 'Cookie: session=abc'")
        .arg(Arg::new("url")
            .short('u')
            .long("url")
            .required(true)
            .num_args(1)
            .help("Target URL to crawl"))
        .arg(Arg::new("threads")
            .short('t')
            .long("threads")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("2")
            .help("Concurrent crawl requests"))
        .arg(Arg::new("level")
            .short('l')
            .long("level")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("2")
            .help("Levels to crawl"))
        .arg(Arg::new("delay")
            .long("delay")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .default_value("0")
            .help("Seconds to wait before each test request"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .default_value("20")
            .help("HTTP request timeout in seconds"))
        .arg(Arg::new("headers")
            .long("headers")
            .num_args(1)
            .help("Extra headers as 'Name: value' lines"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(clap::ArgAction::SetTrue)
            .help("Output CSV report (default: on)"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(clap::ArgAction::SetTrue)
            .help("Output Markdown report (default: on)"))
        .arg(Arg::new("verbose")
            .long("verbose")
            .action(clap::ArgAction::SetTrue)
            .help("Show progress logs"))
        .get_matches();

    let level = if matches.get_flag("verbose") {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = config_from_matches(&matches)?;
    let csv_report = matches.get_flag("csv_report") || !matches.get_flag("markdown_report");
    let markdown_report = matches.get_flag("markdown_report") || !matches.get_flag("csv_report");

    let transport = HttpTransport::new(config.timeout).context("failed to build HTTP client")?;
    let mut report: Vec<ReportRow> = Vec::new();

    phase_banner("Crawling", 1);
    let crawler = Crawler::new(&transport, &config.headers, config.depth, config.threads);
    let crawled = crawler.crawl(&config.target).await?;
    println!(
        "[*] Crawled {} URL(s) and found {} form(s).",
        crawled.urls_visited,
        crawled.form_count()
    );
    report.push(row(
        "Crawling",
        config.target.as_str(),
        format!("{} URL(s), {} form(s)", crawled.urls_visited, crawled.form_count()),
    ));

    phase_banner("Evaluating", 2);
    let eval = evaluate(&crawled.pages);
    report_evaluation(&eval, &config.target, &mut report);

    phase_banner("Comparing", 3);
    if compare(&eval, &mut report) {
        phase_banner("Observing", 4);
        observe(&transport, &config, &eval, &mut report).await;

        phase_banner("Testing", 5);
        test_form(&transport, &config, &crawled.pages, &eval, &mut report).await;

        phase_banner("Analysing", 6);
        analyse(&eval, &mut report);
    }

    if csv_report {
        let name = export_csv(&report).context("failed to write CSV report")?;
        println!("\nCSV report written to {}", name);
    }
    if markdown_report {
        let name = export_markdown(&report).context("failed to write Markdown report")?;
        println!("Markdown report written to {}", name);
    }
    Ok(())
}
