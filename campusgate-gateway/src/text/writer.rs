//! Serialization of values and responses to message text.

use campusgate_protocol::{Module, Payload, Response, Student, Value};

/// Escapes backslash, double quote, newline and carriage return.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes a value.
pub fn to_text(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Serializes a response as `{"success":..,"message":..[,"data":..]}`.
pub fn response_to_text(response: &Response) -> String {
    let mut out = String::with_capacity(64);
    out.push_str("{\"success\":");
    out.push_str(if response.success { "true" } else { "false" });
    out.push_str(",\"message\":");
    write_str(&mut out, &response.message);
    if let Some(data) = &response.data {
        out.push_str(",\"data\":");
        write_payload(&mut out, data);
    }
    out.push('}');
    out
}

fn write_str(out: &mut String, s: &str) {
    out.push('"');
    out.push_str(&escape(s));
    out.push('"');
}

fn write_decimal(out: &mut String, d: f64) {
    if d.is_finite() {
        // Display is positional, never exponent form; a fractional part is
        // forced so 3.0 reads back as a decimal.
        let text = d.to_string();
        out.push_str(&text);
        if !text.contains('.') {
            out.push_str(".0");
        }
    } else {
        out.push_str("null");
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Decimal(d) => write_decimal(out, *d),
        Value::String(s) => write_str(out, s),
        Value::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Mapping(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_payload(out: &mut String, payload: &Payload) {
    match payload {
        Payload::Null => out.push_str("null"),
        Payload::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Payload::Integer(n) => out.push_str(&n.to_string()),
        Payload::Decimal(d) => write_decimal(out, *d),
        Payload::Text(s) => write_str(out, s),
        Payload::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_payload(out, item);
            }
            out.push(']');
        }
        Payload::Student(student) => write_student(out, student),
        Payload::Module(module) => write_module(out, module),
    }
}

fn write_student(out: &mut String, student: &Student) {
    out.push_str("{\"studentId\":");
    write_str(out, &student.student_id);
    out.push_str(",\"name\":");
    write_str(out, &student.name);
    out.push_str(",\"email\":");
    write_str(out, &student.email);
    out.push_str(",\"registeredModules\":[");
    for (i, code) in student.registered_modules.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_str(out, code);
    }
    out.push_str("]}");
}

fn write_module(out: &mut String, module: &Module) {
    out.push_str("{\"moduleCode\":");
    write_str(out, &module.module_code);
    out.push_str(",\"moduleName\":");
    write_str(out, &module.module_name);
    out.push_str(",\"description\":");
    write_str(out, &module.description);
    out.push_str(",\"credits\":");
    out.push_str(&module.credits.to_string());
    out.push('}');
}
