use std::io::{self, Write};

use chrono::NaiveDate;
use template_schedule::{
    ExpandedSchedule, ExpansionConfig, MilestoneId, PreviewService, Priority, TaskId,
    TemplateGraph, WorkCalendar, load_template_from_json, parse_and_validate,
    save_schedule_to_csv, save_schedule_to_json, save_template_to_json,
};

fn parse_id_list(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(|p| {
            p.trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid id '{}'", p.trim()))
        })
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn split_fields(rest: &str) -> Vec<&str> {
    rest.split('|').map(str::trim).collect()
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn render_template(template: &TemplateGraph) -> String {
    let mut rows = Vec::new();
    for milestone in template.milestones() {
        rows.push(vec![
            milestone.id.to_string(),
            milestone.position.to_string(),
            "milestone".to_string(),
            milestone.name.clone(),
            milestone.start_offset.to_string(),
            milestone.due_offset.to_string(),
            String::new(),
        ]);
        for task in &milestone.tasks {
            rows.push(vec![
                task.id.to_string(),
                format!("{}.{}", milestone.position, task.position),
                "task".to_string(),
                task.title.clone(),
                String::new(),
                task.due_offset.to_string(),
                task.priority.as_str().to_string(),
            ]);
        }
    }
    format!(
        "Template: {}\n{}",
        template.name,
        render_text_table(
            &["id", "pos", "kind", "name", "start_offset", "due_offset", "priority"],
            &rows,
        )
    )
}

fn render_schedule(schedule: &ExpandedSchedule) -> String {
    let rows: Vec<Vec<String>> = schedule
        .rows()
        .into_iter()
        .map(|row| {
            vec![
                row.id.to_string(),
                row.kind.to_string(),
                row.name,
                row.start_date.map(|d| d.to_string()).unwrap_or_default(),
                row.due_date.to_string(),
            ]
        })
        .collect();
    render_text_table(&["id", "kind", "name", "start_date", "due_date"], &rows)
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  show                                   Show the template\n  name <text...>                         Rename the template\n  ms <name> | <start> | <due>            Append a milestone\n  ms-insert <pos> <name> | <start> | <due>\n                                         Insert a milestone after position <pos>\n  ms-start <id> <offset...>              Set a milestone's start offset\n  ms-due  <id> <offset...>               Set a milestone's due offset\n  ms-del  <id>                           Remove a milestone and its tasks\n  ms-order <csv>                         Reorder milestones (e.g. 3,1,2)\n  task <ms_id> <title> | <due>           Append a task to a milestone\n  task-due  <ms_id> <id> <offset...>     Set a task's due offset\n  task-prio <ms_id> <id> <priority>      Set priority (low|medium|high|urgent)\n  task-del  <ms_id> <id>                 Remove a task\n  task-order <ms_id> <csv>               Reorder a milestone's tasks\n  parse <offset...>                      Parse and validate an offset\n  preview <YYYY-MM-DD>                   Expand the template from an anchor date\n  issues                                 List every invalid offset\n  mode calendar                          Count offsets in calendar days\n  mode workdays [from_year to_year]      Count offsets in working days\n  save json <path>                       Save the template\n  load json <path>                       Load a template\n  export <json|csv> <YYYY-MM-DD> <path>  Expand and export the schedule\n  quit|exit                              Exit"
    );
}

fn parse_ms_id(s: Option<&str>) -> Option<MilestoneId> {
    s.and_then(|v| v.parse::<MilestoneId>().ok())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut template = TemplateGraph::new("Untitled template");
    let mut preview = PreviewService::default();

    println!("Template Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let (cmd, rest) = input
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((input, ""));
        let mut parts = rest.split_whitespace();

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_template(&template)),
            "name" => {
                if rest.is_empty() {
                    println!("Usage: name <text...>");
                } else {
                    template.name = rest.to_string();
                    println!("Template renamed.");
                }
            }
            "ms" | "ms-insert" => {
                let (after, body) = if cmd == "ms-insert" {
                    match rest.split_once(char::is_whitespace) {
                        Some((pos, body)) => match pos.parse::<usize>() {
                            Ok(pos) => (Some(pos), body),
                            Err(_) => {
                                println!("Invalid position");
                                continue;
                            }
                        },
                        None => {
                            println!("Usage: ms-insert <pos> <name> | <start> | <due>");
                            continue;
                        }
                    }
                } else {
                    (None, rest)
                };
                match split_fields(body).as_slice() {
                    [name, start, due] if !name.is_empty() => {
                        match template.add_milestone(*name, *start, *due, after) {
                            Ok(milestone) => println!(
                                "Added milestone id={} at position {}.",
                                milestone.id, milestone.position
                            ),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: {cmd} <name> | <start offset> | <due offset>"),
                }
            }
            "ms-start" | "ms-due" => {
                let Some(id) = parse_ms_id(parts.next()) else {
                    println!("Usage: {cmd} <id> <offset...>");
                    continue;
                };
                let offset = parts.collect::<Vec<_>>().join(" ");
                let result = if cmd == "ms-start" {
                    template.set_milestone_offsets(id, Some(offset.into()), None)
                } else {
                    template.set_milestone_offsets(id, None, Some(offset.into()))
                };
                match result {
                    Ok(()) => println!("{cmd} set."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "ms-del" => match parse_ms_id(parts.next()) {
                Some(id) => match template.remove_milestone(id) {
                    Ok(removed) => println!(
                        "Deleted milestone {id} with {} task(s).",
                        removed.tasks.len()
                    ),
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: ms-del <id>"),
            },
            "ms-order" => match parse_id_list(rest) {
                Ok(order) => match template.reorder_milestones(&order) {
                    Ok(()) => println!("Milestones reordered."),
                    Err(e) => println!("Error: {e}"),
                },
                Err(e) => println!("{e}"),
            },
            "task" => {
                let Some((ms, body)) = rest.split_once(char::is_whitespace) else {
                    println!("Usage: task <ms_id> <title> | <due offset>");
                    continue;
                };
                let Some(ms_id) = parse_ms_id(Some(ms)) else {
                    println!("Invalid milestone id");
                    continue;
                };
                match split_fields(body).as_slice() {
                    [title, due] if !title.is_empty() => {
                        match template.add_task(ms_id, *title, *due, None) {
                            Ok(task) => println!(
                                "Added task id={} at position {}.",
                                task.id, task.position
                            ),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: task <ms_id> <title> | <due offset>"),
                }
            }
            "task-due" | "task-prio" | "task-del" => {
                let ids = (
                    parse_ms_id(parts.next()),
                    parts.next().and_then(|v| v.parse::<TaskId>().ok()),
                );
                let (Some(ms_id), Some(task_id)) = ids else {
                    println!("Usage: {cmd} <ms_id> <task_id> ...");
                    continue;
                };
                let value = parts.collect::<Vec<_>>().join(" ");
                let result = match cmd {
                    "task-due" => template.set_task_due_offset(ms_id, task_id, value),
                    "task-prio" => match value.parse::<Priority>() {
                        Ok(priority) => match template
                            .milestone_mut(ms_id)
                            .and_then(|m| m.tasks.iter_mut().find(|t| t.id == task_id))
                        {
                            Some(task) => {
                                task.priority = priority;
                                Ok(())
                            }
                            None => {
                                println!("Task {task_id} not found in milestone {ms_id}.");
                                continue;
                            }
                        },
                        Err(e) => {
                            println!("{e}");
                            continue;
                        }
                    },
                    _ => template.remove_task(ms_id, task_id).map(|_| ()),
                };
                match result {
                    Ok(()) => println!("{cmd} done."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "task-order" => {
                let Some(ms_id) = parse_ms_id(parts.next()) else {
                    println!("Usage: task-order <ms_id> <csv>");
                    continue;
                };
                match parse_id_list(parts.next().unwrap_or("")) {
                    Ok(order) => match template.reorder_tasks(ms_id, &order) {
                        Ok(()) => println!("Tasks reordered."),
                        Err(e) => println!("Error: {e}"),
                    },
                    Err(e) => println!("{e}"),
                }
            }
            "parse" => match parse_and_validate(rest) {
                Ok(duration) => println!("{} day(s) ({duration})", duration.days()),
                Err(e) => println!("Invalid offset: {e}"),
            },
            "preview" => match parse_date(rest) {
                Some(anchor) => match preview.preview(&template, anchor) {
                    Ok(schedule) => println!(
                        "Preview ({})\n{}",
                        schedule.summary().to_cli_summary(),
                        render_schedule(&schedule)
                    ),
                    Err(e) => println!("Not ready to preview: {e}"),
                },
                None => println!("Usage: preview <YYYY-MM-DD>"),
            },
            "issues" => {
                let issues = preview.field_issues(&template);
                if issues.is_empty() {
                    println!("No issues.");
                }
                for issue in issues {
                    println!("{} {}: {}", issue.node, issue.field, issue.message);
                }
            }
            "mode" => match parts.next() {
                Some("calendar") => {
                    preview = PreviewService::default();
                    println!("Counting calendar days.");
                }
                Some("workdays") => {
                    let years = (
                        parts.next().and_then(|v| v.parse::<i32>().ok()),
                        parts.next().and_then(|v| v.parse::<i32>().ok()),
                    );
                    let calendar = match years {
                        (Some(from), Some(to)) => WorkCalendar::with_us_holidays(from, to),
                        _ => WorkCalendar::default(),
                    };
                    preview = PreviewService::new(ExpansionConfig::working_days(calendar));
                    println!("Counting working days.");
                }
                _ => println!("Usage: mode calendar | mode workdays [from_year to_year]"),
            },
            "save" | "load" => {
                let (Some("json"), Some(path)) = (parts.next(), parts.next()) else {
                    println!("Usage: {cmd} json <path>");
                    continue;
                };
                if cmd == "save" {
                    match save_template_to_json(&template, path) {
                        Ok(()) => println!("Template saved to {path}."),
                        Err(e) => println!("Error saving template: {e}"),
                    }
                } else {
                    match load_template_from_json(path) {
                        Ok(loaded) => {
                            template = loaded;
                            println!("Template loaded from {path}.");
                        }
                        Err(e) => println!("Error loading template: {e}"),
                    }
                }
            }
            "export" => {
                let (Some(format), Some(anchor), Some(path)) =
                    (parts.next(), parts.next().and_then(parse_date), parts.next())
                else {
                    println!("Usage: export <json|csv> <YYYY-MM-DD> <path>");
                    continue;
                };
                let schedule = match preview.preview(&template, anchor) {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        println!("Cannot export: {e}");
                        continue;
                    }
                };
                let result = match format {
                    "json" => save_schedule_to_json(&schedule, path),
                    "csv" => save_schedule_to_csv(&schedule, path),
                    other => {
                        println!("Unknown export format '{other}'");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Schedule exported to {path}."),
                    Err(e) => println!("Error exporting schedule: {e}"),
                }
            }
            _ => println!("Unknown command. Type 'help' for commands."),
        }
    }
}
