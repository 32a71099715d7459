/**
 * TABLEAU DE BORD HTML - Page d'accueil du collecteur (GET /)
 *
 * Consommateur passif : reçoit la vue de vivacité et le journal déjà
 * calculés, ne touche à aucun état. Toutes les valeurs sont échappées.
 */

use crate::models::{LivenessView, LogRecord, RawStatus, StatusView};

const STYLE: &str = r#"
        body { font-family: 'Arial', sans-serif; padding: 24px; background-color: #f4f4f9; }
        h1 { color: #2563eb; }
        table { width: 100%; max-width: 960px; border-collapse: collapse; background: #fff; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
        th, td { padding: 12px 16px; border-bottom: 1px solid #ccc; }
        thead { background-color: #2563eb; color: white; }
        .status-online { color: green; font-weight: bold; }
        .status-offline { color: red; font-weight: bold; }
        .log-container { margin-top: 24px; max-width: 960px; background: white; padding: 16px; border-radius: 8px;
            font-family: monospace; white-space: pre-wrap; max-height: 300px; overflow-y: auto; }
"#;

pub fn render(views: &[LivenessView], log: &[LogRecord]) -> String {
    let mut rows = String::new();
    for v in views {
        let wire = StatusView::from(v);
        let status_class = class_for(wire.status == RawStatus::Offline);
        let offline_class = class_for(wire.offline);
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td class=\"{}\">{}</td></tr>\n",
            escape(&v.address),
            escape(&v.display_name),
            escape(&wire.process),
            status_class,
            wire.status,
            escape(&wire.timestamp),
            offline_class,
            if wire.offline { "Sim" } else { "Não" },
        ));
    }

    let log_lines: Vec<String> = log.iter().map(format_log_line).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Monitor de Processos</title>
    <style>{STYLE}</style>
</head>
<body>
    <h1>Monitor de Processos</h1>
    <table>
        <thead>
            <tr><th>IP</th><th>Nome da Conexão</th><th>Processo</th><th>Status</th><th>Última Atualização</th><th>Offline</th></tr>
        </thead>
        <tbody>
{rows}        </tbody>
    </table>
    <div class="log-container">
        <strong>Logs Recentes:</strong>
        <pre>{log}</pre>
    </div>
</body>
</html>
"#,
        log = log_lines.join("<br>"),
    )
}

fn class_for(offline: bool) -> &'static str {
    if offline {
        "status-offline"
    } else {
        "status-online"
    }
}

fn format_log_line(rec: &LogRecord) -> String {
    let status_color = if rec.status == RawStatus::Offline { "red" } else { "green" };
    [
        ("timestamp", "gray", escape(&rec.timestamp)),
        ("ip", "blue", escape(&rec.address)),
        ("nome_conexao", "black", escape(&rec.display_name)),
        ("process", "purple", escape(&rec.process)),
        ("status", status_color, rec.status.to_string()),
    ]
    .iter()
    .map(|(key, color, value)| format!(r#"<span style="color: {color};"><strong>{key}:</strong> {value}</span>"#))
    .collect::<Vec<_>>()
    .join(" | ")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
