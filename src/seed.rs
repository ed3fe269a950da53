use std::collections::HashMap;

use crate::sheet::{Column, DisplayHint, Value};

/// Row count the table is padded to on startup.
pub const INITIAL_ROWS: usize = 25;

/// Status values offered as footer tabs, in display order.
pub const STATUSES: [&str; 4] = ["In-process", "Need to start", "Complete", "Blocked"];

fn hint(class: &str, icon: &str) -> DisplayHint {
    DisplayHint {
        class: class.to_string(),
        icon: icon.to_string(),
        width: None,
    }
}

pub fn initial_columns() -> Vec<Column> {
    let grey = "bg-[#EEEEEE] text-[#757575]";
    let green = "bg-[#E8F0E9] text-[#666C66]";
    let purple = "bg-[#EAE3FC] text-[#655C80]";
    let orange = "bg-[#FFE9E0] text-[#8C6C62]";
    vec![
        Column::new("jobRequest", "Job Request").with_hint(hint(grey, "Briefcase.svg")),
        Column::new("submitted", "Submitted").with_hint(hint(grey, "Calendar.svg")),
        Column::new("status", "Status").with_hint(hint(grey, "Chevron Circle.svg")),
        Column::new("submitter", "Submitter").with_hint(hint(grey, "Person.svg")),
        Column::new("url", "URL").with_hint(hint(grey, "Globe.svg")),
        Column::new("assigned", "Assigned").with_hint(hint(green, "Emoji.svg")),
        Column::new("priority", "Priority")
            .unsortable()
            .with_hint(hint(purple, "")),
        Column::new("dueDate", "Due Date")
            .unsortable()
            .with_hint(hint(purple, "")),
        Column::new("estValue", "Est. Value")
            .numeric()
            .unsortable()
            .with_hint(hint(orange, "")),
    ]
}

#[allow(clippy::too_many_arguments)]
fn task(
    job_request: &str,
    submitted: &str,
    status: &str,
    submitter: &str,
    url: &str,
    assigned: &str,
    priority: &str,
    due_date: &str,
    est_value: f64,
) -> HashMap<String, Value> {
    HashMap::from([
        ("jobRequest".to_string(), Value::from(job_request)),
        ("submitted".to_string(), Value::from(submitted)),
        ("status".to_string(), Value::from(status)),
        ("submitter".to_string(), Value::from(submitter)),
        ("url".to_string(), Value::from(url)),
        ("assigned".to_string(), Value::from(assigned)),
        ("priority".to_string(), Value::from(priority)),
        ("dueDate".to_string(), Value::from(due_date)),
        ("estValue".to_string(), Value::from(est_value)),
    ])
}

pub fn initial_rows() -> Vec<HashMap<String, Value>> {
    vec![
        task(
            "Launch social media campaign for product launch",
            "15-11-2024",
            "In-process",
            "Aisha Patel",
            "www.aishapatel.com",
            "Sophie Choudhury",
            "Medium",
            "20-11-2024",
            6200000.0,
        ),
        task(
            "Update press kit for company redesign",
            "28-10-2024",
            "Need to start",
            "Irfan Khan",
            "www.irfankhang.com",
            "Tejas Pandey",
            "High",
            "30-10-2024",
            3500000.0,
        ),
        task(
            "Finalize user testing feedback for app redesign",
            "05-12-2024",
            "In-process",
            "Mark Johnson",
            "www.markjohns.com",
            "Rachel Lee",
            "Medium",
            "10-12-2024",
            4750000.0,
        ),
        task(
            "Design new features for the website",
            "10-01-2025",
            "Complete",
            "Emily Green",
            "www.emilygreen.com",
            "Tom Wright",
            "Low",
            "15-01-2025",
            5900000.0,
        ),
        task(
            "Prepare financial report for Q4",
            "25-01-2025",
            "Blocked",
            "Jessica Brown",
            "www.jessicabro.com",
            "Kevin Smith",
            "Low",
            "30-01-2025",
            2800000.0,
        ),
    ]
}
