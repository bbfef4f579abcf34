use yarn_scene::{
    Curves, ParamList, PointsPolygons, Request, ScopeEffect, ScopeKind, ShaderCall, Sphere,
    Torus,
};

use crate::error::SinkError;

/// Receives scene-description requests, in order.
pub trait SceneSink {
    fn submit(&mut self, request: Request) -> Result<(), SinkError>;
}

/// Walks a request stream and checks that scopes nest: every end matches the
/// innermost open scope, depth never goes negative, and nothing is left open.
/// Returns the deepest nesting seen.
pub fn check_scope_balance<'a>(
    requests: impl IntoIterator<Item = &'a Request>,
) -> Result<usize, SinkError> {
    let mut stack = ScopeStack::default();
    let mut deepest = 0;
    for request in requests {
        stack.apply(request)?;
        deepest = deepest.max(stack.depth());
    }
    stack.finish()?;
    Ok(deepest)
}

#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    open: Vec<ScopeKind>,
}

impl ScopeStack {
    pub(crate) fn apply(&mut self, request: &Request) -> Result<(), SinkError> {
        match request.scope_effect() {
            Some(ScopeEffect::Open(kind)) => self.open.push(kind),
            Some(ScopeEffect::Close(kind)) => match self.open.last() {
                None => return Err(SinkError::UnopenedScope { kind }),
                Some(&expected) if expected != kind => {
                    return Err(SinkError::MismatchedScope {
                        expected,
                        found: kind,
                    })
                }
                Some(_) => {
                    self.open.pop();
                }
            },
            None => {}
        }
        Ok(())
    }

    pub(crate) fn depth(&self) -> usize {
        self.open.len()
    }

    pub(crate) fn finish(&self) -> Result<(), SinkError> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(SinkError::UnclosedScopes {
                open: self.open.len(),
            })
        }
    }
}

/// Scene-description session over a sink.
///
/// Scoped blocks take a closure; the closing request is always sent after
/// the body runs, even when the body fails, so a session can only produce
/// balanced scopes.
pub struct Session<S: SceneSink> {
    sink: S,
    depth: usize,
    submitted: usize,
}

impl<S: SceneSink> Session<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            depth: 0,
            submitted: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    fn submit(&mut self, request: Request) -> Result<(), SinkError> {
        tracing::trace!(request = request.name(), depth = self.depth, "submit");
        self.submitted += 1;
        self.sink.submit(request)
    }

    fn scoped<T, E, F>(&mut self, open: Request, close: Request, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SinkError>,
    {
        self.submit(open)?;
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        let closed = self.submit(close);
        let value = result?;
        closed?;
        Ok(value)
    }

    /// `Begin`/`End` around a whole scene. `name` is the archive or
    /// render target the renderer associates with the frame.
    pub fn frame<T, E, F>(&mut self, name: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SinkError>,
    {
        let open = Request::Begin {
            name: name.to_string(),
        };
        self.scoped(open, Request::End, body)
    }

    pub fn world<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SinkError>,
    {
        self.scoped(Request::WorldBegin, Request::WorldEnd, body)
    }

    pub fn transform<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SinkError>,
    {
        self.scoped(Request::TransformBegin, Request::TransformEnd, body)
    }

    pub fn attributes<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SinkError>,
    {
        self.scoped(Request::AttributeBegin, Request::AttributeEnd, body)
    }

    pub fn option(&mut self, category: &str, params: ParamList) -> Result<(), SinkError> {
        self.submit(Request::Option {
            category: category.to_string(),
            params,
        })
    }

    pub fn display(&mut self, name: &str, driver: &str, mode: &str) -> Result<(), SinkError> {
        self.submit(Request::Display {
            name: name.to_string(),
            driver: driver.to_string(),
            mode: mode.to_string(),
        })
    }

    pub fn format(&mut self, width: u32, height: u32, pixel_aspect: f32) -> Result<(), SinkError> {
        self.submit(Request::Format {
            width,
            height,
            pixel_aspect,
        })
    }

    pub fn hider(&mut self, kind: &str, params: ParamList) -> Result<(), SinkError> {
        self.submit(Request::Hider {
            kind: kind.to_string(),
            params,
        })
    }

    pub fn shading_rate(&mut self, rate: f32) -> Result<(), SinkError> {
        self.submit(Request::ShadingRate(rate))
    }

    pub fn pixel_variance(&mut self, variance: f32) -> Result<(), SinkError> {
        self.submit(Request::PixelVariance(variance))
    }

    pub fn integrator(&mut self, call: ShaderCall) -> Result<(), SinkError> {
        self.submit(Request::Integrator(call))
    }

    pub fn projection(&mut self, kind: &str, params: ParamList) -> Result<(), SinkError> {
        self.submit(Request::Projection {
            kind: kind.to_string(),
            params,
        })
    }

    pub fn translate(&mut self, offset: [f32; 3]) -> Result<(), SinkError> {
        self.submit(Request::Translate(offset))
    }

    pub fn rotate(&mut self, angle: f32, axis: [f32; 3]) -> Result<(), SinkError> {
        self.submit(Request::Rotate { angle, axis })
    }

    pub fn scale(&mut self, factors: [f32; 3]) -> Result<(), SinkError> {
        self.submit(Request::Scale(factors))
    }

    pub fn declare(&mut self, name: &str, declaration: &str) -> Result<(), SinkError> {
        self.submit(Request::Declare {
            name: name.to_string(),
            declaration: declaration.to_string(),
        })
    }

    pub fn attribute(&mut self, category: &str, params: ParamList) -> Result<(), SinkError> {
        self.submit(Request::Attribute {
            category: category.to_string(),
            params,
        })
    }

    pub fn light(&mut self, call: ShaderCall) -> Result<(), SinkError> {
        self.submit(Request::Light(call))
    }

    pub fn pattern(&mut self, call: ShaderCall) -> Result<(), SinkError> {
        self.submit(Request::Pattern(call))
    }

    pub fn bxdf(&mut self, call: ShaderCall) -> Result<(), SinkError> {
        self.submit(Request::Bxdf(call))
    }

    pub fn displace(&mut self, call: ShaderCall) -> Result<(), SinkError> {
        self.submit(Request::Displace(call))
    }

    pub fn torus(&mut self, torus: Torus) -> Result<(), SinkError> {
        self.submit(Request::Torus(torus))
    }

    pub fn sphere(&mut self, sphere: Sphere) -> Result<(), SinkError> {
        self.submit(Request::Sphere(sphere))
    }

    pub fn curves(&mut self, curves: Curves) -> Result<(), SinkError> {
        self.submit(Request::Curves(curves))
    }

    pub fn polygon(&mut self, params: ParamList) -> Result<(), SinkError> {
        self.submit(Request::Polygon { params })
    }

    pub fn points_polygons(&mut self, mesh: PointsPolygons) -> Result<(), SinkError> {
        self.submit(Request::PointsPolygons(mesh))
    }
}
