use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};

use crate::commands::task::{CountsResult, CycleCheckResult};
use crate::commands::{DataCommand, TaskCommand};
use crate::id::TaskId;
use crate::types::{StatusUpdate, Task, TaskStatus, TaskTree};
use crate::Command;

/// Color policy: --no-color > NO_COLOR env > TERM=dumb > !isatty > default (color)
fn should_use_color_for(no_color_flag: bool, is_tty: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("TERM").ok().as_deref() == Some("dumb") {
        return false;
    }
    is_tty
}

fn should_use_color(no_color_flag: bool) -> bool {
    should_use_color_for(no_color_flag, std::io::stdout().is_terminal())
}

fn should_use_color_stderr(no_color_flag: bool) -> bool {
    should_use_color_for(no_color_flag, std::io::stderr().is_terminal())
}

/// Color scheme for output
struct Colors {
    task_id: Style,
    complete: Style,
    done: Style,
    in_progress: Style,
    other: Style,
    root: Style,
    tree_line: Style,
    error: Style,
}

impl Colors {
    fn new(use_color: bool) -> Self {
        if use_color {
            Self {
                task_id: Style::new().cyan().dimmed(),
                complete: Style::new().green(),
                done: Style::new().blue(),
                in_progress: Style::new().yellow(),
                other: Style::new().magenta(),
                root: Style::new().bold(),
                tree_line: Style::new().dimmed(),
                error: Style::new().red().bold(),
            }
        } else {
            Self {
                task_id: Style::new(),
                complete: Style::new(),
                done: Style::new(),
                in_progress: Style::new(),
                other: Style::new(),
                root: Style::new(),
                tree_line: Style::new(),
                error: Style::new(),
            }
        }
    }
}

/// Handles human-readable CLI output.
pub struct Printer {
    colors: Colors,
}

impl Printer {
    pub fn new(no_color_flag: bool) -> Self {
        Self {
            colors: Colors::new(should_use_color(no_color_flag)),
        }
    }

    pub fn new_for_stderr(no_color_flag: bool) -> Self {
        Self {
            colors: Colors::new(should_use_color_stderr(no_color_flag)),
        }
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{}", message.style(self.colors.error));
    }

    fn fmt_id(&self, id: &impl std::fmt::Display) -> String {
        format!("{}", format!("#{}", id).style(self.colors.task_id))
    }

    fn status_symbol_style(&self, status: &TaskStatus) -> (&'static str, Style) {
        match status {
            TaskStatus::Complete => ("✓", self.colors.complete),
            TaskStatus::Done => ("●", self.colors.done),
            TaskStatus::InProgress => ("○", self.colors.in_progress),
            TaskStatus::Other(_) => ("·", self.colors.other),
        }
    }

    fn fmt_status(&self, status: &TaskStatus) -> String {
        let (sym, style) = self.status_symbol_style(status);
        format!("{}", sym.style(style))
    }

    pub fn print(&self, command: &Command, output: &str) {
        match command {
            Command::Init => println!("Initialized cascade database"),
            Command::Task(TaskCommand::Delete { .. }) => println!("Task deleted"),
            Command::Task(TaskCommand::Status(_)) => self.print_updates(output),
            Command::Task(TaskCommand::Tree(_)) => self.print_trees(output),
            Command::Task(TaskCommand::List(_)) | Command::Task(TaskCommand::Children { .. }) => {
                self.print_task_list(output)
            }
            Command::Task(TaskCommand::Ancestors { .. })
            | Command::Task(TaskCommand::Descendants { .. })
            | Command::Task(TaskCommand::InvalidParents { .. }) => self.print_ids(output),
            Command::Task(TaskCommand::Counts { .. }) => self.print_counts(output),
            Command::Task(TaskCommand::CheckParent(_)) => self.print_cycle_check(output),
            Command::Task(_) => self.print_task(output),
            Command::Data(DataCommand::Export { .. }) | Command::Data(DataCommand::Import { .. }) => {
                self.print_data(output)
            }
            // PRECONDITION: Completions handled in main() before print() is called
            Command::Completions { .. } => unreachable!("completions handled before print()"),
        }
    }

    fn print_task(&self, output: &str) {
        let Ok(task) = serde_json::from_str::<Task>(output) else {
            println!("{}", output);
            return;
        };
        println!(
            "[{}] {} - {}",
            self.fmt_status(&task.status),
            self.fmt_id(&task.id),
            task.header
        );
        println!("  Status: {}", task.status);
        if let Some(parent_id) = task.parent_id {
            println!("  Parent: {}", self.fmt_id(&parent_id));
        }
        for (label, value) in [
            ("Type", &task.task_type),
            ("Reviewer", &task.reviewer),
            ("Target", &task.target),
            ("Limit", &task.limit),
        ] {
            if let Some(value) = value {
                println!("  {}: {}", label, value);
            }
        }
    }

    fn print_task_list(&self, output: &str) {
        let Ok(tasks) = serde_json::from_str::<Vec<Task>>(output) else {
            println!("{}", output);
            return;
        };
        if tasks.is_empty() {
            println!("No tasks found");
            return;
        }
        for t in &tasks {
            println!(
                "[{}] {} - {}",
                self.fmt_status(&t.status),
                self.fmt_id(&t.id),
                t.header
            );
        }
        self.print_summary(tasks.iter().map(|t| &t.status));
    }

    fn print_updates(&self, output: &str) {
        let Ok(updates) = serde_json::from_str::<Vec<StatusUpdate>>(output) else {
            println!("{}", output);
            return;
        };
        let mut iter = updates.iter();
        if let Some(first) = iter.next() {
            println!(
                "{} -> [{}] {}",
                self.fmt_id(&first.id),
                self.fmt_status(&first.status),
                first.status
            );
        }
        for update in iter {
            println!(
                "  {} {} -> [{}] {}",
                "↳".style(self.colors.tree_line),
                self.fmt_id(&update.id),
                self.fmt_status(&update.status),
                update.status
            );
        }
    }

    fn print_trees(&self, output: &str) {
        let Ok(trees) = serde_json::from_str::<Vec<TaskTree>>(output) else {
            println!("{}", output);
            return;
        };
        if trees.is_empty() {
            println!("No tasks found");
            return;
        }

        let mut statuses = Vec::new();
        for (i, tree) in trees.iter().enumerate() {
            Self::collect_statuses(tree, &mut statuses);
            self.print_tree_node(tree, "", true, true);
            if i < trees.len() - 1 {
                println!();
            }
        }
        self.print_summary(statuses.iter());
    }

    fn collect_statuses(node: &TaskTree, out: &mut Vec<TaskStatus>) {
        out.push(node.task.status.clone());
        for child in &node.children {
            Self::collect_statuses(child, out);
        }
    }

    fn print_tree_node(&self, node: &TaskTree, prefix: &str, is_last: bool, is_root: bool) {
        let connector = if is_last { "└─" } else { "├─" };
        let header = if is_root {
            format!("{}", node.task.header.style(self.colors.root))
        } else {
            node.task.header.clone()
        };
        let tally = if node.counts.total > 0 {
            format!(
                " {}",
                format!("({}/{} complete)", node.counts.complete, node.counts.total)
                    .style(self.colors.tree_line)
            )
        } else {
            String::new()
        };

        println!(
            "{}{} [{}] {} - {}{}",
            prefix.style(self.colors.tree_line),
            connector.style(self.colors.tree_line),
            self.fmt_status(&node.task.status),
            self.fmt_id(&node.task.id),
            header,
            tally
        );

        let new_prefix = format!("{}{}  ", prefix, if is_last { " " } else { "│" });
        for (i, child) in node.children.iter().enumerate() {
            self.print_tree_node(child, &new_prefix, i == node.children.len() - 1, false);
        }
    }

    fn print_ids(&self, output: &str) {
        let Ok(ids) = serde_json::from_str::<Vec<TaskId>>(output) else {
            println!("{}", output);
            return;
        };
        if ids.is_empty() {
            println!("(none)");
            return;
        }
        let rendered: Vec<String> = ids.iter().map(|id| self.fmt_id(id)).collect();
        println!("{}", rendered.join(" "));
    }

    fn print_counts(&self, output: &str) {
        let Ok(result) = serde_json::from_str::<CountsResult>(output) else {
            println!("{}", output);
            return;
        };
        let c = result.counts;
        println!(
            "{} children | {} done | {} complete{}",
            c.total,
            c.done.style(self.colors.done),
            c.complete.style(self.colors.complete),
            if result.all_complete {
                " | all complete"
            } else {
                ""
            }
        );
    }

    fn print_cycle_check(&self, output: &str) {
        let Ok(check) = serde_json::from_str::<CycleCheckResult>(output) else {
            println!("{}", output);
            return;
        };
        let subject = match check.task_id {
            Some(id) => self.fmt_id(&id),
            None => "new task".to_string(),
        };
        if check.would_create_cycle {
            println!(
                "{} {} cannot be parented under {}",
                "✗".style(self.colors.error),
                subject,
                self.fmt_id(&check.parent_id)
            );
        } else {
            println!(
                "{} {} may be parented under {}",
                "✓".style(self.colors.complete),
                subject,
                self.fmt_id(&check.parent_id)
            );
        }
    }

    fn print_data(&self, output: &str) {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(output) else {
            println!("{}", output);
            return;
        };
        let tasks = json.get("tasks").and_then(|v| v.as_u64()).unwrap_or(0);
        if let Some(path) = json.get("path").and_then(|v| v.as_str()) {
            println!("Exported {} tasks to {}", tasks, path);
        } else {
            println!("Imported {} tasks", tasks);
        }
    }

    fn print_summary<'s>(&self, statuses: impl Iterator<Item = &'s TaskStatus>) {
        let (mut complete, mut done, mut in_progress, mut other, mut total) = (0, 0, 0, 0, 0);
        for status in statuses {
            total += 1;
            match status {
                TaskStatus::Complete => complete += 1,
                TaskStatus::Done => done += 1,
                TaskStatus::InProgress => in_progress += 1,
                TaskStatus::Other(_) => other += 1,
            }
        }
        println!();
        println!(
            "{}/{} complete | {} done | {} in progress | {} other",
            complete.style(self.colors.complete),
            total,
            done.style(self.colors.done),
            in_progress.style(self.colors.in_progress),
            other.style(self.colors.other),
        );
    }
}
