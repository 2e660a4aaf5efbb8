use crate::dataset::CategoryRecordset;
use crate::error::RetroResult;
use crate::logging;

/// Output contract appended to every question. The field names (`type`,
/// `title`, `data`, `name`, `value`) are what `interpret` parses back.
pub const RESPONSE_FORMAT_INSTRUCTIONS: &str = r#"INSTRUCCIONES DE FORMATO DE RESPUESTA (obligatorio):

1. Si la pregunta pide un desglose, comparación o distribución entre categorías, responde SOLO con un objeto JSON con esta forma exacta:
{"type": "chart", "title": "Título del gráfico", "data": [{"name": "Categoría", "value": 10}, {"name": "Otra categoría", "value": 5}]}

2. Si la pregunta pide un único dato numérico (un conteo, un total, un porcentaje), responde SOLO con un objeto JSON con esta forma exacta:
{"type": "value", "value": 42}

3. En cualquier otro caso, responde en texto plano, claro y organizado (puedes usar una lista numerada). No envuelvas el texto en JSON ni en bloques de código.

Los valores de "value" deben ser números, nunca texto."#;

/// Build the single text prompt sent to the completion endpoint
pub fn build_prompt(recordset: &CategoryRecordset, question: &str) -> RetroResult<String> {
    let summary = serde_json::to_string_pretty(&recordset.without_empty())?;

    logging::log_prompt(Some(question), &format!(
        "Embedding {} populated categories ({} bytes of JSON)",
        recordset.populated().count(),
        summary.len()
    ));

    Ok(format!(
        "Aquí tienes un resumen detallado de la retrospectiva del equipo en formato JSON. \
Usa esta información para responder preguntas de manera clara y concisa:\n\n\
{}\n\n\
Pregunta: {}\n\n\
{}",
        summary,
        question.trim(),
        RESPONSE_FORMAT_INSTRUCTIONS
    ))
}
