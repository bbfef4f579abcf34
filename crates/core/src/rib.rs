use std::fmt::Write as _;
use std::io::Write;

use yarn_scene::{CurveWidths, ParamList, ParamValue, Request, ShaderCall};

use crate::error::SinkError;
use crate::session::{SceneSink, ScopeStack};

const INDENT: &str = "    ";

/// Writes requests as indented ASCII RIB.
///
/// Tracks open scopes itself and refuses an end that does not match the
/// innermost begin, so a stream produced by hand is checked as well.
pub struct RibWriter<W: Write> {
    out: W,
    scopes: ScopeStack,
    line: String,
}

impl<W: Write> RibWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scopes: ScopeStack::default(),
            line: String::new(),
        }
    }

    /// Checks that every scope was closed and flushes the output.
    pub fn finish(mut self) -> Result<W, SinkError> {
        self.scopes.finish()?;
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> SceneSink for RibWriter<W> {
    fn submit(&mut self, request: Request) -> Result<(), SinkError> {
        let before = self.scopes.depth();
        self.scopes.apply(&request)?;
        // Closing lines sit at the depth of their opening line.
        let depth = before.min(self.scopes.depth());

        self.line.clear();
        for _ in 0..depth {
            self.line.push_str(INDENT);
        }
        write_request(&mut self.line, &request);
        self.line.push('\n');
        self.out.write_all(self.line.as_bytes())?;
        Ok(())
    }
}

/// Formats one request as a single RIB line (without indentation).
pub fn format_request(request: &Request) -> String {
    let mut line = String::new();
    write_request(&mut line, request);
    line
}

fn write_request(out: &mut String, request: &Request) {
    match request {
        Request::Begin { name } => {
            out.push_str("##RenderMan RIB\n# frame ");
            push_quoted(out, name);
        }
        Request::End => out.push_str("# end of frame"),
        Request::Option { category, params } => {
            push_named(out, "Option", category);
            push_params(out, params);
        }
        Request::Display { name, driver, mode } => {
            out.push_str("Display");
            for value in [name, driver, mode] {
                out.push(' ');
                push_quoted(out, value);
            }
        }
        Request::Format {
            width,
            height,
            pixel_aspect,
        } => {
            let _ = write!(out, "Format {width} {height} {pixel_aspect}");
        }
        Request::Hider { kind, params } => {
            push_named(out, "Hider", kind);
            push_params(out, params);
        }
        Request::ShadingRate(rate) => {
            let _ = write!(out, "ShadingRate {rate}");
        }
        Request::PixelVariance(variance) => {
            let _ = write!(out, "PixelVariance {variance}");
        }
        Request::Integrator(call) => push_shader(out, "Integrator", call),
        Request::Projection { kind, params } => {
            push_named(out, "Projection", kind);
            push_params(out, params);
        }
        Request::WorldBegin => out.push_str("WorldBegin"),
        Request::WorldEnd => out.push_str("WorldEnd"),
        Request::TransformBegin => out.push_str("TransformBegin"),
        Request::TransformEnd => out.push_str("TransformEnd"),
        Request::AttributeBegin => out.push_str("AttributeBegin"),
        Request::AttributeEnd => out.push_str("AttributeEnd"),
        Request::Translate([x, y, z]) => {
            let _ = write!(out, "Translate {x} {y} {z}");
        }
        Request::Rotate {
            angle,
            axis: [x, y, z],
        } => {
            let _ = write!(out, "Rotate {angle} {x} {y} {z}");
        }
        Request::Scale([x, y, z]) => {
            let _ = write!(out, "Scale {x} {y} {z}");
        }
        Request::Declare { name, declaration } => {
            push_named(out, "Declare", name);
            out.push(' ');
            push_quoted(out, declaration);
        }
        Request::Attribute { category, params } => {
            push_named(out, "Attribute", category);
            push_params(out, params);
        }
        Request::Light(call) => push_shader(out, "Light", call),
        Request::Pattern(call) => push_shader(out, "Pattern", call),
        Request::Bxdf(call) => push_shader(out, "Bxdf", call),
        Request::Displace(call) => push_shader(out, "Displace", call),
        Request::Torus(torus) => {
            let _ = write!(
                out,
                "Torus {} {} {} {} {}",
                torus.major_radius, torus.minor_radius, torus.phi_min, torus.phi_max, torus.theta_max
            );
        }
        Request::Sphere(sphere) => {
            let _ = write!(
                out,
                "Sphere {} {} {} {}",
                sphere.radius, sphere.z_min, sphere.z_max, sphere.theta_max
            );
        }
        Request::Curves(curves) => {
            push_named(out, "Curves", curves.basis.token());
            out.push(' ');
            push_array(out, &curves.nvertices);
            out.push(' ');
            push_quoted(out, curves.wrap.token());
            out.push_str(" \"P\" ");
            push_array(out, &curves.points);
            match &curves.widths {
                CurveWidths::Constant(width) => {
                    let _ = write!(out, " \"constantwidth\" [{width}]");
                }
                CurveWidths::Uniform(widths) => {
                    out.push_str(" \"uniform float width\" ");
                    push_array(out, widths);
                }
            }
        }
        Request::Polygon { params } => {
            out.push_str("Polygon");
            push_params(out, params);
        }
        Request::PointsPolygons(mesh) => {
            out.push_str("PointsPolygons ");
            push_array(out, &mesh.nverts);
            out.push(' ');
            push_array(out, &mesh.verts);
            out.push_str(" \"P\" ");
            push_array(out, &mesh.points);
            if let Some(st) = &mesh.st {
                out.push_str(" \"st\" ");
                push_array(out, st);
            }
        }
    }
}

fn push_named(out: &mut String, keyword: &str, name: &str) {
    out.push_str(keyword);
    out.push(' ');
    push_quoted(out, name);
}

fn push_shader(out: &mut String, keyword: &str, call: &ShaderCall) {
    push_named(out, keyword, &call.shader);
    out.push(' ');
    push_quoted(out, &call.handle);
    push_params(out, &call.params);
}

fn push_params(out: &mut String, params: &ParamList) {
    for (decl, value) in params.iter() {
        out.push(' ');
        push_quoted(out, decl);
        out.push(' ');
        match value {
            ParamValue::Int(values) => push_array(out, values),
            ParamValue::Float(values) => push_array(out, values),
            ParamValue::String(values) => {
                out.push('[');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    push_quoted(out, value);
                }
                out.push(']');
            }
        }
    }
}

fn push_array<T: std::fmt::Display>(out: &mut String, values: &[T]) {
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{value}");
    }
    out.push(']');
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use yarn_scene::{CurveBasis, CurveWrap, Curves, Torus};

    use crate::session::Session;

    fn render(build: impl FnOnce(&mut Session<RibWriter<Vec<u8>>>) -> Result<(), SinkError>) -> String {
        let mut session = Session::new(RibWriter::new(Vec::new()));
        build(&mut session).unwrap();
        let bytes = session.into_inner().finish().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn writes_indented_scopes() {
        let text = render(|s| {
            s.world(|s| {
                s.attributes(|s| {
                    s.bxdf(ShaderCall::new(
                        "PxrDiffuse",
                        "diff",
                        ParamList::new().with_color("color diffuseColor", [0.3, 0.6, 0.9]),
                    ))?;
                    s.torus(Torus::full(1.0, 0.3))
                })
            })
        });
        assert_eq!(
            text,
            "WorldBegin\n\
             \x20   AttributeBegin\n\
             \x20       Bxdf \"PxrDiffuse\" \"diff\" \"color diffuseColor\" [0.3 0.6 0.9]\n\
             \x20       Torus 1 0.3 0 360 360\n\
             \x20   AttributeEnd\n\
             WorldEnd\n"
        );
    }

    #[test]
    fn formats_curves_with_uniform_widths() {
        let curves = Curves {
            basis: CurveBasis::Cubic,
            nvertices: vec![4],
            wrap: CurveWrap::Nonperiodic,
            points: vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 1.5],
            widths: CurveWidths::Uniform(vec![0.003]),
        };
        assert_eq!(
            format_request(&Request::Curves(curves)),
            "Curves \"cubic\" [4] \"nonperiodic\" \"P\" [0 0 0 0 0 0.5 0 0 1 0 0 1.5] \"uniform float width\" [0.003]"
        );
    }

    #[test]
    fn formats_mixed_params_and_escapes_strings() {
        let params = ParamList::new()
            .with_int("int incremental", 1)
            .with_string("string lightColorMap", "say \"hi\".tex");
        assert_eq!(
            format_request(&Request::Hider {
                kind: "raytrace".to_string(),
                params,
            }),
            "Hider \"raytrace\" \"int incremental\" [1] \"string lightColorMap\" [\"say \\\"hi\\\".tex\"]"
        );
    }

    #[test]
    fn rejects_end_without_begin() {
        let mut writer = RibWriter::new(Vec::new());
        writer.submit(Request::WorldBegin).unwrap();
        assert!(matches!(
            writer.submit(Request::AttributeEnd),
            Err(SinkError::MismatchedScope { .. })
        ));
        writer.submit(Request::WorldEnd).unwrap();
        assert!(matches!(
            writer.submit(Request::WorldEnd),
            Err(SinkError::UnopenedScope { .. })
        ));
    }

    #[test]
    fn finish_rejects_open_scopes() {
        let mut writer = RibWriter::new(Vec::new());
        writer.submit(Request::TransformBegin).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(SinkError::UnclosedScopes { open: 1 })
        ));
    }
}
