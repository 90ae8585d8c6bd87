//! The HTML status page and the modify endpoint.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::models::TrackedInstance;

const STATUS_TEMPLATE: &str = r#"<!DOCTYPE html>
<title>PromMSD Status</title>
<style>
	body { font-family: -apple-system,system-ui,BlinkMacSystemFont,"Segoe UI",Roboto,"Helvetica Neue",Arial,sans-serif; }
	table { width: 100%; border-collapse: collapse; }
	th { font-weight: bold; }
	th, td { border: 1px solid #aaa; padding: 5px; }
	tr.good { background-color: #cfc; }
	tr.alert { background-color: #fcc; }
	button.delete { background-color: #fbb; }
</style>

<script>
  async function del(button) {
		try {
			let key = button.dataset.key;
			let r = await fetch("/modify?key=" + encodeURIComponent(key), {
				method: "DELETE"
			});
			if (r.status != 200) {
				let text = await r.text();
				alert(r.status + ": " + text);
			} else {
				window.location.reload();
			}
		} catch(e) {
			alert(e);
		}
	}
</script>

<p>
	A Prometheus monitoring safety device.
</p>

<p>
	Monitoring {{ instances|length }} instances.

{% if instances %}
	<table>
		<tr>
			<th>Key</th>
			<th>Graph</th>
			<th>Status</th>
			<th></th>
		</tr>
		{% for row in instances %}
		<tr class="{{ 'alert' if row.active else 'good' }}">
			<td>{{ row.key }}</td>
			<td><a href="{{ row.generator_url }}">Graph</a></td>
			<td>
				{% if row.active %}
					Activated {{ row.activate_rel }} ago
				{% else %}
					Activate in {{ row.activate_rel }}
					{% if row.activated_ago %}
					<br>
					Alert last activated {{ row.activated_ago }} ago
					{% endif %}
				{% endif %}
				{% if row.resolved_ago %}
				<br>
				Last resolved {{ row.resolved_ago }} ago
				{% endif %}
				{% if row.last_sent_ago %}
				<br>
				Last sent: {{ row.last_sent_ago }} ago (includes resolved alerts)
				{% endif %}
				{% if row.last_error %}
				<br>
				Last error: {{ row.last_error }}
				{% endif %}
			</td>
			<td>
			  <button class="delete" data-key="{{ row.key }}" onclick="del(this)">Delete</button>
			</td>
		</tr>
		{% endfor %}
	</table>
{% endif %}
"#;

/// Renders the status page over registry snapshots.
pub(super) struct StatusPage {
    env: Environment<'static>,
}

/// One table row, precomputed so the template stays presentation-only.
#[derive(Serialize)]
struct StatusRow {
    key: String,
    generator_url: String,
    active: bool,
    activate_rel: String,
    activated_ago: Option<String>,
    resolved_ago: Option<String>,
    last_sent_ago: Option<String>,
    last_error: Option<String>,
}

impl StatusRow {
    fn new(key: String, instance: &TrackedInstance, now: DateTime<Utc>) -> Self {
        StatusRow {
            key,
            generator_url: instance.generator_url.clone(),
            active: instance.is_active(now),
            activate_rel: humanise(now, instance.activate_at),
            activated_ago: instance.activated_at.map(|at| humanise(now, at)),
            resolved_ago: instance.resolved_at.map(|at| humanise(now, at)),
            last_sent_ago: instance.last_sent.map(|at| humanise(now, at)),
            last_error: instance.last_error.clone(),
        }
    }
}

impl StatusPage {
    pub(super) fn new() -> Self {
        let mut env = Environment::new();
        // The .html name turns auto-escaping on.
        env.add_template("status.html", STATUS_TEMPLATE)
            .expect("status template should parse");
        StatusPage { env }
    }

    fn render(
        &self,
        entries: &[(String, TrackedInstance)],
        now: DateTime<Utc>,
    ) -> Result<String, minijinja::Error> {
        let instances: Vec<StatusRow> =
            entries.iter().map(|(key, instance)| StatusRow::new(key.clone(), instance, now)).collect();
        let template = self.env.get_template("status.html")?;
        template.render(minijinja::context! { instances })
    }
}

/// Distance between two instants, rounded to seconds, in a compact
/// `1h2m3s` form.
fn humanise(now: DateTime<Utc>, t: DateTime<Utc>) -> String {
    let diff = if now > t { now - t } else { t - now };
    let total = diff.num_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `GET /`: a read-locked snapshot of everything being monitored.
pub(super) async fn status(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let entries = state.registry.snapshot();
    let html = state
        .status
        .render(&entries, Utc::now())
        .map_err(|err| ApiError::InternalServerError(err.to_string()))?;
    Ok(Html(html).into_response())
}

/// `DELETE /modify?key=...`: drops one tracked instance.
pub(super) async fn modify(
    State(state): State<ApiState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::DELETE {
        return ApiError::BadRequest("only DELETE currently supported".to_string()).into_response();
    }

    match params.get("key") {
        Some(key) if state.registry.remove(key) => "ok".into_response(),
        _ => ApiError::BadRequest("key does not exist".to_string()).into_response(),
    }
}
