//! Style registry: named, fixed recipes built from the shared stages.
//!
//! A [`Style`] is one of a closed set of names. Its [`StyleProfile`] is
//! an immutable record describing the preprocessing, the edge/threshold
//! algorithm and the postprocessing steps, built once by a `const`
//! constructor and passed by value. Nothing in a profile changes while
//! a style runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::denoise::BilateralParams;
use crate::edge::{self, EdgeAlgorithm, EdgeMask, EdgeSource, GapFill, ThresholdPair};
use crate::halftone::{self, StippleParams};
use crate::morphology::{self, KernelShape};
use crate::preprocess::{self, PreprocessParams};
use crate::professional::{self, ProfessionalParams};
use crate::threshold::{AdaptiveMethod, AdaptiveParams};
use crate::types::{BinaryMask, EngraveConfig, EngraveError, KernelSize};

/// Named engraving style.
///
/// Ordering follows declaration order and fixes the order of styles in
/// every result map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Gradient-magnitude outlines, thinned.
    Standard,
    /// Gaussian adaptive threshold minus its own edges, opened.
    Detailed,
    /// Mean adaptive threshold minus thick edges, closed.
    Bold,
    /// Blurred multi-scale edges, dilated.
    Artistic,
    /// Smoothed, thick, closed edges.
    Embossed,
    /// Stipple dots inside edge loops plus the edges.
    Halftone,
    /// Edges smeared along both diagonals.
    Crosshatch,
    /// Nine-stage pendant pipeline.
    Professional,
    /// Clean line art from smoothed edges.
    Canny,
    /// Blur, soft contrast and a mean adaptive threshold.
    Classic,
    /// Wide bilateral smoothing, then a global Otsu threshold.
    Soft,
    /// Doubled intensities, then smoothed line art.
    Contrast,
}

impl Style {
    /// Every style, in result order.
    pub const ALL: [Self; 12] = [
        Self::Standard,
        Self::Detailed,
        Self::Bold,
        Self::Artistic,
        Self::Embossed,
        Self::Halftone,
        Self::Crosshatch,
        Self::Professional,
        Self::Canny,
        Self::Classic,
        Self::Soft,
        Self::Contrast,
    ];

    /// Styles produced for every request.
    pub const BASELINE: [Self; 3] = [Self::Standard, Self::Detailed, Self::Bold];

    /// Lowercase name used on the wire and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Detailed => "detailed",
            Self::Bold => "bold",
            Self::Artistic => "artistic",
            Self::Embossed => "embossed",
            Self::Halftone => "halftone",
            Self::Crosshatch => "crosshatch",
            Self::Professional => "professional",
            Self::Canny => "canny",
            Self::Classic => "classic",
            Self::Soft => "soft",
            Self::Contrast => "contrast",
        }
    }

    /// The fixed recipe of this style.
    #[must_use]
    pub const fn profile(self) -> StyleProfile {
        match self {
            Self::Standard => StyleProfile::standard(),
            Self::Detailed => StyleProfile::detailed(),
            Self::Bold => StyleProfile::bold(),
            Self::Artistic => StyleProfile::artistic(),
            Self::Embossed => StyleProfile::embossed(),
            Self::Halftone => StyleProfile::halftone(),
            Self::Crosshatch => StyleProfile::crosshatch(),
            Self::Professional => StyleProfile::professional(),
            Self::Canny => StyleProfile::canny(),
            Self::Classic => StyleProfile::classic(),
            Self::Soft => StyleProfile::soft(),
            Self::Contrast => StyleProfile::contrast(),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Style {
    type Err = EngraveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngraveError::UnknownStyle(s.to_owned()))
    }
}

/// What a request asks for: every style or a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleSelection {
    /// The `"all"` pseudo-style.
    #[default]
    All,
    /// One named style.
    Single(Style),
}

impl StyleSelection {
    /// The style whose result is vectorized.
    #[must_use]
    pub const fn primary(self) -> Style {
        match self {
            Self::All => Style::Standard,
            Self::Single(style) => style,
        }
    }

    /// The set of styles to run.
    ///
    /// The baseline trio is always included. `All` adds every style, or
    /// only the styles in `filter` when it is non-empty. `Single` adds
    /// its style and ignores `filter`.
    #[must_use]
    pub fn resolve(self, filter: &[Style]) -> BTreeSet<Style> {
        let mut styles: BTreeSet<Style> = Style::BASELINE.into_iter().collect();
        match self {
            Self::All if filter.is_empty() => styles.extend(Style::ALL),
            Self::All => styles.extend(filter.iter().copied()),
            Self::Single(style) => {
                styles.insert(style);
            }
        }
        styles
    }
}

impl fmt::Display for StyleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Single(style) => style.fmt(f),
        }
    }
}

impl FromStr for StyleSelection {
    type Err = EngraveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Single)
        }
    }
}

/// Parse a list of style names.
///
/// # Errors
///
/// Returns [`EngraveError::UnknownStyle`] for the first unknown name.
pub fn parse_styles<S: AsRef<str>>(names: &[S]) -> Result<Vec<Style>, EngraveError> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// One postprocessing step applied after edge extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStep {
    /// Dilate with an element, `n` times.
    Dilate(KernelShape, u32),
    /// Dilate independently with two elements and OR the results.
    DilateEach(KernelShape, KernelShape),
    /// Morphological open.
    Open(KernelShape),
    /// Morphological close.
    Close(KernelShape),
    /// Bitwise NOT.
    Invert,
}

impl PostStep {
    /// Apply this step.
    #[must_use = "returns the processed image"]
    pub fn apply(self, image: &GrayImage) -> GrayImage {
        match self {
            Self::Dilate(shape, iterations) => morphology::dilate(image, shape, iterations),
            Self::DilateEach(first, second) => morphology::union(
                &morphology::dilate(image, first, 1),
                &morphology::dilate(image, second, 1),
            ),
            Self::Open(shape) => morphology::open(image, shape),
            Self::Close(shape) => morphology::close(image, shape),
            Self::Invert => edge::invert(image),
        }
    }
}

/// How a style turns its preprocessed image into a mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recipe {
    /// Edge/threshold extraction followed by postprocessing steps.
    Staged {
        /// Extraction algorithm.
        edges: EdgeAlgorithm,
        /// Steps applied in order.
        post: &'static [PostStep],
    },
    /// Edges, then stipple dots inside the edge loops.
    Halftone {
        /// Detector thresholds.
        edges: ThresholdPair,
        /// Dot parameters.
        stipple: StippleParams,
    },
    /// The professional stage pipeline (always pendant-masked).
    Professional(ProfessionalParams),
}

/// Immutable parameter record of one style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleProfile {
    /// Style this profile belongs to.
    pub style: Style,
    /// Steps run before extraction.
    pub preprocess: PreprocessParams,
    /// Extraction and postprocessing.
    pub recipe: Recipe,
}

impl StyleProfile {
    const fn staged(
        style: Style,
        preprocess: PreprocessParams,
        edges: EdgeAlgorithm,
        post: &'static [PostStep],
    ) -> Self {
        Self {
            style,
            preprocess,
            recipe: Recipe::Staged { edges, post },
        }
    }

    const fn blurred(size: u32) -> PreprocessParams {
        PreprocessParams {
            blur: Some(KernelSize::new(size)),
            ..PreprocessParams::NONE
        }
    }

    const fn smoothed(params: BilateralParams) -> PreprocessParams {
        PreprocessParams {
            denoise: Some(params),
            ..PreprocessParams::NONE
        }
    }

    /// Sobel magnitude > 30, cross-eroded once, inverted.
    #[must_use]
    pub const fn standard() -> Self {
        Self::staged(
            Style::Standard,
            PreprocessParams::NONE,
            EdgeAlgorithm::GradientMagnitude {
                threshold: 30,
                thin: true,
            },
            &[PostStep::Invert],
        )
    }

    /// Gaussian adaptive threshold (11, 2) minus its own 50/150 edges,
    /// opened with 2×2.
    #[must_use]
    pub const fn detailed() -> Self {
        Self::staged(
            Style::Detailed,
            PreprocessParams::NONE,
            EdgeAlgorithm::Combined {
                adaptive: AdaptiveParams::new(AdaptiveMethod::Gaussian, 11, 2.0),
                edges: EdgeMask {
                    thresholds: ThresholdPair::FINE,
                    source: EdgeSource::Adaptive,
                    dilation: None,
                },
            },
            &[PostStep::Open(KernelShape::SQUARE_2)],
        )
    }

    /// Mean adaptive threshold (15, 2) minus 30/90 edges dilated three
    /// times by 3×3, closed with 3×3.
    #[must_use]
    pub const fn bold() -> Self {
        Self::staged(
            Style::Bold,
            PreprocessParams::NONE,
            EdgeAlgorithm::Combined {
                adaptive: AdaptiveParams::new(AdaptiveMethod::Mean, 15, 2.0),
                edges: EdgeMask {
                    thresholds: ThresholdPair::new(30.0, 90.0),
                    source: EdgeSource::Gray,
                    dilation: Some((KernelShape::SQUARE_3, 3)),
                },
            },
            &[PostStep::Close(KernelShape::SQUARE_3)],
        )
    }

    /// Blur 5, 50/150 ∪ 100/200 edges dilated by 2×2, inverted.
    #[must_use]
    pub const fn artistic() -> Self {
        Self::staged(
            Style::Artistic,
            Self::blurred(5),
            EdgeAlgorithm::MultiScale {
                pairs: [ThresholdPair::FINE, ThresholdPair::COARSE],
                gap_fill: GapFill::Dilate(KernelShape::SQUARE_2),
            },
            &[PostStep::Invert],
        )
    }

    /// Bilateral (15, 80, 80), 60/150 edges, dilated and closed by 3×3,
    /// inverted.
    #[must_use]
    pub const fn embossed() -> Self {
        Self::staged(
            Style::Embossed,
            Self::smoothed(BilateralParams::SOFT),
            EdgeAlgorithm::Canny(ThresholdPair::new(60.0, 150.0)),
            &[
                PostStep::Dilate(KernelShape::SQUARE_3, 1),
                PostStep::Close(KernelShape::SQUARE_3),
                PostStep::Invert,
            ],
        )
    }

    /// Blur 5, 60/140 edges, dots of radius 3 inside loops over 20 px².
    #[must_use]
    pub const fn halftone() -> Self {
        Self {
            style: Style::Halftone,
            preprocess: Self::blurred(5),
            recipe: Recipe::Halftone {
                edges: ThresholdPair::new(60.0, 140.0),
                stipple: StippleParams {
                    min_area: StippleParams::DEFAULT_MIN_AREA,
                    dot_radius: StippleParams::DEFAULT_DOT_RADIUS,
                },
            },
        }
    }

    /// Bilateral (9, 75, 75), 50/150 edges dilated along each diagonal
    /// and OR'd, inverted.
    #[must_use]
    pub const fn crosshatch() -> Self {
        Self::staged(
            Style::Crosshatch,
            Self::smoothed(BilateralParams::SMOOTH),
            EdgeAlgorithm::Canny(ThresholdPair::FINE),
            &[
                PostStep::DilateEach(KernelShape::Diagonal, KernelShape::AntiDiagonal),
                PostStep::Invert,
            ],
        )
    }

    /// The professional pendant pipeline.
    #[must_use]
    pub const fn professional() -> Self {
        Self {
            style: Style::Professional,
            preprocess: PreprocessParams::NONE,
            recipe: Recipe::Professional(ProfessionalParams::DEFAULT),
        }
    }

    /// Bilateral (9, 75, 75), 50/150 edges dilated by 2×2, inverted.
    #[must_use]
    pub const fn canny() -> Self {
        Self::staged(
            Style::Canny,
            Self::smoothed(BilateralParams::SMOOTH),
            EdgeAlgorithm::Canny(ThresholdPair::FINE),
            &[PostStep::Dilate(KernelShape::SQUARE_2, 1), PostStep::Invert],
        )
    }

    /// Blur 7, contrast 0.8, mean adaptive threshold (17, 3.5).
    #[must_use]
    pub const fn classic() -> Self {
        Self::staged(
            Style::Classic,
            PreprocessParams {
                blur: Some(KernelSize::new(7)),
                contrast: 0.8,
                ..PreprocessParams::NONE
            },
            EdgeAlgorithm::Adaptive(AdaptiveParams::new(AdaptiveMethod::Mean, 17, 3.5)),
            &[],
        )
    }

    /// Bilateral (15, 80, 80), Otsu threshold. Bright regions stay
    /// white, so fur reads as soft tonal masses rather than lines.
    #[must_use]
    pub const fn soft() -> Self {
        Self::staged(
            Style::Soft,
            Self::smoothed(BilateralParams::SOFT),
            EdgeAlgorithm::Otsu,
            &[],
        )
    }

    /// Gain 2.0, bilateral (9, 75, 75), 30/90 edges dilated by 2×2,
    /// inverted.
    #[must_use]
    pub const fn contrast() -> Self {
        Self::staged(
            Style::Contrast,
            PreprocessParams {
                gain: 2.0,
                denoise: Some(BilateralParams::SMOOTH),
                ..PreprocessParams::NONE
            },
            EdgeAlgorithm::Canny(ThresholdPair::new(30.0, 90.0)),
            &[PostStep::Dilate(KernelShape::SQUARE_2, 1), PostStep::Invert],
        )
    }
}

/// Run one style on a grayscale image.
///
/// # Errors
///
/// Returns [`EngraveError::Processing`] if a stage yields a non-binary
/// result.
pub fn run_style(
    image: &GrayImage,
    style: Style,
    config: &EngraveConfig,
) -> Result<BinaryMask, EngraveError> {
    let start = Instant::now();
    let profile = style.profile();
    let prepared = preprocess::preprocess(image, &profile.preprocess);

    let mask = match profile.recipe {
        Recipe::Staged { edges, post } => {
            let extracted = edge::extract_edges(&prepared, &edges);
            let finished = post.iter().fold(extracted, |img, step| step.apply(&img));
            BinaryMask::try_from_gray(finished)?
        }
        Recipe::Halftone { edges, stipple } => {
            let edge_map = edge::canny(&prepared, edges);
            BinaryMask::try_from_gray(halftone::stipple(&edge_map, stipple))?
        }
        Recipe::Professional(params) => professional::run(prepared, params, config.pendant_margin)?,
    };

    tracing::debug!(
        %style,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        mean = mask.mean(),
        "style complete"
    );
    Ok(mask)
}

/// Run every style of a selection.
///
/// Either every style succeeds or the first failure is returned; there
/// are no partial results.
///
/// # Errors
///
/// Propagates the first [`run_style`] failure.
pub fn run_selection(
    image: &GrayImage,
    selection: StyleSelection,
    filter: &[Style],
    config: &EngraveConfig,
) -> Result<BTreeMap<Style, BinaryMask>, EngraveError> {
    selection
        .resolve(filter)
        .into_iter()
        .map(|style| run_style(image, style, config).map(|mask| (style, mask)))
        .collect()
}
