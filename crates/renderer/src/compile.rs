use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// Position of a diagnostic inside the shader source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
    /// Byte offset of the offending text.
    pub offset: u32,
    pub length: u32,
}

/// One message produced while compiling a shader module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderDiagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl ShaderDiagnostic {
    /// Renders the diagnostic with the offending source excerpt, e.g.
    ///
    /// ```text
    /// Line 3:7 - vec5
    /// unknown type: `vec5`
    /// ```
    pub fn format(&self, source: &str) -> String {
        let mut formatted = String::new();
        if let Some(span) = self.span {
            formatted.push_str(&format!(
                "Line {}:{} - {}\n",
                span.line,
                span.column,
                excerpt(source, span)
            ));
        }
        formatted.push_str(&self.message);
        formatted
    }
}

fn excerpt(source: &str, span: SourceSpan) -> &str {
    let start = (span.offset as usize).min(source.len());
    let end = start.saturating_add(span.length as usize).min(source.len());
    source.get(start..end).unwrap_or("")
}

impl From<&wgpu::CompilationMessage> for ShaderDiagnostic {
    fn from(message: &wgpu::CompilationMessage) -> Self {
        let severity = match message.message_type {
            wgpu::CompilationMessageType::Error => DiagnosticSeverity::Error,
            wgpu::CompilationMessageType::Warning => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Info,
        };
        Self {
            severity,
            message: message.message.clone(),
            span: message.location.as_ref().map(|location| SourceSpan {
                line: location.line_number,
                column: location.line_position,
                offset: location.offset,
                length: location.length,
            }),
        }
    }
}

/// Logs every diagnostic at its own severity. Returns the number of errors.
pub(crate) fn log_diagnostics(
    label: &str,
    source: &str,
    diagnostics: &[ShaderDiagnostic],
) -> usize {
    let mut errors = 0;
    for diagnostic in diagnostics {
        let formatted = diagnostic.format(source);
        match diagnostic.severity {
            DiagnosticSeverity::Error => {
                errors += 1;
                tracing::error!(shader = label, "{formatted}");
            }
            DiagnosticSeverity::Warning => tracing::warn!(shader = label, "{formatted}"),
            DiagnosticSeverity::Info => tracing::info!(shader = label, "{formatted}"),
        }
    }
    errors
}

/// Compiles WGSL into a shader module and reports its diagnostics.
///
/// Diagnostics never fail the call: an unusable module is rejected later when
/// the pipeline is created from it.
pub(crate) async fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> wgpu::ShaderModule {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });

    let info = module.get_compilation_info().await;
    let diagnostics: Vec<ShaderDiagnostic> =
        info.messages.iter().map(ShaderDiagnostic::from).collect();
    let errors = log_diagnostics(label, source, &diagnostics);

    if let Some(err) = device.pop_error_scope().await {
        if errors == 0 {
            tracing::error!(shader = label, "{err}");
        }
    }
    tracing::debug!(shader = label, messages = diagnostics.len(), "compiled shader module");
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "fn main() {\n    let x = vec5<f32>(1.0);\n}\n";

    #[test]
    fn format_includes_line_and_excerpt() {
        let diagnostic = ShaderDiagnostic {
            severity: DiagnosticSeverity::Error,
            message: "unknown type".into(),
            span: Some(SourceSpan {
                line: 3,
                column: 7,
                offset: 10,
                length: 4,
            }),
        };
        let source = "0123456789ABCDEFGHIJ";
        let formatted = diagnostic.format(source);
        assert!(formatted.contains("Line 3"));
        assert!(formatted.contains("ABCD"));
        assert!(formatted.ends_with("unknown type"));
    }

    #[test]
    fn format_without_span_is_message_only() {
        let diagnostic = ShaderDiagnostic {
            severity: DiagnosticSeverity::Warning,
            message: "unused variable".into(),
            span: None,
        };
        assert_eq!(diagnostic.format(SOURCE), "unused variable");
    }

    #[test]
    fn excerpt_is_clamped_to_source() {
        let span = SourceSpan {
            line: 1,
            column: 1,
            offset: 64,
            length: 100,
        };
        assert_eq!(excerpt(SOURCE, span), "");
        let span = SourceSpan {
            offset: 24,
            length: 100,
            ..span
        };
        assert_eq!(excerpt(SOURCE, span), "vec5<f32>(1.0);\n}\n");
    }

    #[test]
    fn counts_error_diagnostics() {
        let diagnostics = vec![
            ShaderDiagnostic {
                severity: DiagnosticSeverity::Error,
                message: "a".into(),
                span: None,
            },
            ShaderDiagnostic {
                severity: DiagnosticSeverity::Info,
                message: "b".into(),
                span: None,
            },
        ];
        assert_eq!(log_diagnostics("test", SOURCE, &diagnostics), 1);
    }
}
