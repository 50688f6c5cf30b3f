use crate::cli::OutputFormat;
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// State fields never printed in clear text.
const SECRET_FIELDS: &[&str] = &["password", "token"];

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
        OutputFormat::Yaml => {
            println!("{}", render_yaml(value));
        }
        OutputFormat::Table => {
            print_as_table(value);
        }
    }
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Replaces secret fields of a state object with `***`.
pub fn mask_secrets(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        for field in SECRET_FIELDS {
            if let Some(v) = map.get_mut(*field)
                && v.as_str().is_some_and(|s| !s.is_empty())
            {
                *v = Value::String("***".to_string());
            }
        }
    }
    value
}

fn print_as_table(value: &Value) {
    let Some(obj) = value.as_object() else {
        println!("{}", render_yaml(value));
        return;
    };
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, v) in obj {
        let shown = match v {
            Value::String(s) if s.is_empty() => "-".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        builder.push_record([key.as_str(), shown.as_str()]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

fn render_yaml(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(yaml) => yaml.trim_end().to_string(),
        Err(_) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    }
}
