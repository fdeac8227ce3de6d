//! `stackhand cron list`.

use chrono::SecondsFormat;
use serde_json::json;

use stackhand_config::Config;
use stackhand_cron::{plan, ScheduledJob};

pub(crate) fn list(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = plan(&config.stacks_dir, &config.executor.compose_file)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&render_json(&jobs))?),
        "table" => print!("{}", render_table(&jobs)),
        other => return Err(format!("Unknown format: {} (expected table or json)", other).into()),
    }
    Ok(())
}

fn next_run(job: &ScheduledJob) -> String {
    job.next_run()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

fn render_json(jobs: &[ScheduledJob]) -> serde_json::Value {
    let jobs: Vec<_> = jobs
        .iter()
        .map(|job| {
            let d = &job.descriptor;
            json!({
                "stack": d.stack,
                "service": d.service,
                "schedule": d.schedule,
                "profile": d.profile,
                "run_on_deploy": d.run_on_deploy,
                "next_run": job.next_run(),
            })
        })
        .collect();
    json!({ "count": jobs.len(), "jobs": jobs })
}

fn render_table(jobs: &[ScheduledJob]) -> String {
    if jobs.is_empty() {
        return "No cron-enabled services found.\n".to_string();
    }

    let rows: Vec<[String; 4]> = jobs
        .iter()
        .map(|job| {
            [
                job.id().to_string(),
                job.descriptor.schedule.clone(),
                if job.descriptor.run_on_deploy { "yes" } else { "no" }.to_string(),
                next_run(job),
            ]
        })
        .collect();

    let header = ["JOB", "SCHEDULE", "ON DEPLOY", "NEXT RUN"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
        out.push_str(line.trim_end());
        out.push('\n');
    };
    push_row(header);
    for row in &rows {
        push_row([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]);
    }
    out
}
