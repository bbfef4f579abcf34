use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use yarn_core::{Integrator, SceneConfig};

#[derive(Debug, Parser)]
#[command(name = "yarnball", about = "Generate a hairy yarn ball scene for RenderMan")]
pub struct Cli {
    #[arg(short = 's', long = "shadingrate", help = "Shading rate [default: 10]")]
    pub shading_rate: Option<f32>,
    #[arg(short = 'p', long = "pixelvar", help = "Pixel variance [default: 0.1]")]
    pub pixel_variance: Option<f32>,
    #[arg(short = 'f', long, help = "Camera field of view in degrees [default: 48]")]
    pub fov: Option<f32>,
    #[arg(long, help = "Image width [default: 1024]")]
    pub width: Option<u32>,
    #[arg(long, help = "Image height [default: 720]")]
    pub height: Option<u32>,
    #[arg(long, value_enum, help = "Integrator [default: path-tracer]")]
    pub integrator: Option<IntegratorArg>,

    #[arg(long, help = "Scene config (JSON); flags override its values")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Base seed for hair batches")]
    pub seed: Option<u64>,
    #[arg(long, help = "Number of tori in every layer of the ball")]
    pub tori: Option<usize>,
    #[arg(long, help = "Skip hair generation")]
    pub no_hair: bool,

    #[arg(long, value_name = "PATH", help = "Write a RIB archive instead of rendering ('-' for stdout)")]
    pub rib: Option<PathBuf>,
    #[arg(long, default_value = "prman", help = "Renderer command; receives RIB on stdin")]
    pub renderer: String,
    #[arg(long, help = "Assemble the scene and report counts without writing anything")]
    pub dry_run: bool,
    #[arg(long = "shader", value_name = "NAME", help = "OSL shader to compile before rendering")]
    pub shaders: Vec<String>,
    #[arg(long, help = "Print the effective config as JSON and exit")]
    pub print_config: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-v debug, -vv trace)")]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IntegratorArg {
    PathTracer,
    Default,
    Vcm,
    Direct,
    Wire,
    Normals,
    St,
}

impl From<IntegratorArg> for Integrator {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::PathTracer => Integrator::PathTracer,
            IntegratorArg::Default => Integrator::Default,
            IntegratorArg::Vcm => Integrator::Vcm,
            IntegratorArg::Direct => Integrator::DirectLighting,
            IntegratorArg::Wire => Integrator::Wireframe,
            IntegratorArg::Normals => Integrator::Normals,
            IntegratorArg::St => Integrator::St,
        }
    }
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut SceneConfig) {
        let render = &mut config.render;
        if let Some(rate) = self.shading_rate {
            render.shading_rate = rate;
        }
        if let Some(variance) = self.pixel_variance {
            render.pixel_variance = variance;
        }
        if let Some(width) = self.width {
            render.width = width;
        }
        if let Some(height) = self.height {
            render.height = height;
        }
        if let Some(integrator) = self.integrator {
            render.integrator = integrator.into();
        }
        if let Some(fov) = self.fov {
            config.camera.fov = fov;
        }

        let ball = &mut config.yarn_ball;
        if let Some(count) = self.tori {
            for layer in &mut ball.tori {
                layer.count = count;
            }
        }
        if self.no_hair {
            for layer in &mut ball.tori {
                layer.hair = None;
            }
            if let Some(core) = ball.core.as_mut() {
                core.hair = None;
            }
        }
        if let Some(seed) = self.seed {
            let core_hair = ball.core.as_mut().and_then(|core| core.hair.as_mut());
            let layer_hair = ball.tori.iter_mut().filter_map(|layer| layer.hair.as_mut());
            for hair in layer_hair.chain(core_hair) {
                hair.seed = seed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yarn_core::CoreSphereSettings;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "yarnball",
            "-s",
            "4",
            "--pixelvar",
            "0.05",
            "--integrator",
            "normals",
            "--tori",
            "12",
            "--seed",
            "7",
        ])
        .unwrap();
        let mut config = SceneConfig::default();
        config.yarn_ball.core = Some(CoreSphereSettings::default());
        let outer = config.yarn_ball.tori[0].clone();
        config.yarn_ball.tori.push(outer);
        cli.apply(&mut config);

        assert_eq!(config.render.shading_rate, 4.0);
        assert_eq!(config.render.pixel_variance, 0.05);
        assert_eq!(config.render.integrator, Integrator::Normals);
        assert_eq!(config.render.width, 1024);
        for layer in &config.yarn_ball.tori {
            assert_eq!(layer.count, 12);
            assert_eq!(layer.hair.as_ref().map(|h| h.seed), Some(7));
        }
        let core_seed = config
            .yarn_ball
            .core
            .as_ref()
            .and_then(|core| core.hair.as_ref())
            .map(|h| h.seed);
        assert_eq!(core_seed, Some(7));
    }

    #[test]
    fn no_hair_drops_every_batch() {
        let cli = Cli::try_parse_from(["yarnball", "--no-hair", "-vv"]).unwrap();
        let mut config = SceneConfig::default();
        config.yarn_ball.core = Some(CoreSphereSettings::default());
        cli.apply(&mut config);
        assert!(config.yarn_ball.tori.iter().all(|layer| layer.hair.is_none()));
        assert!(config.yarn_ball.core.and_then(|core| core.hair).is_none());
        assert_eq!(cli.log_level(), LevelFilter::TRACE);
    }

    #[test]
    fn rejects_unknown_integrator() {
        assert!(Cli::try_parse_from(["yarnball", "--integrator", "bidir"]).is_err());
    }
}
