use super::PersistenceResult;
use crate::{ExpandedSchedule, ExpansionConfig, TemplateGraph};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn save_template_to_json<P: AsRef<Path>>(
    template: &TemplateGraph,
    path: P,
) -> PersistenceResult<()> {
    template.validate_structure()?;
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, template)?;
    tracing::debug!(path = %path.as_ref().display(), "template saved");
    Ok(())
}

/// Templates read from disk are structure-checked before use.
pub fn load_template_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<TemplateGraph> {
    let file = File::open(path.as_ref())?;
    let template: TemplateGraph = serde_json::from_reader(BufReader::new(file))?;
    template.validate_structure()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        milestones = template.milestones().len(),
        tasks = template.task_count(),
        "template loaded"
    );
    Ok(template)
}

pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &ExpandedSchedule,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, schedule)?;
    Ok(())
}

#[derive(Serialize)]
struct ScheduleCsvRecord {
    kind: &'static str,
    id: u32,
    milestone_id: u32,
    name: String,
    start_date: String,
    due_date: String,
}

/// One row per milestone followed by its tasks, in template order.
pub fn save_schedule_to_csv<P: AsRef<Path>>(
    schedule: &ExpandedSchedule,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);
    for row in schedule.rows() {
        writer.serialize(ScheduleCsvRecord {
            kind: row.kind,
            id: row.id,
            milestone_id: row.milestone_id,
            name: row.name,
            start_date: format_date(row.start_date),
            due_date: format_date(Some(row.due_date)),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_expansion_config<P: AsRef<Path>>(path: P) -> PersistenceResult<ExpansionConfig> {
    let file = File::open(path.as_ref())?;
    let config: ExpansionConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
