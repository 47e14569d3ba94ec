use branchling::{ResolveResultVerbose, StepKind};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(path: &str, res: &ResolveResultVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let shown = if path.is_empty() { "<free walk>" } else { path };
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Resolving: \"{shown}\""), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Walk ━━━", ansi::GRAY));
    println!("  mode: {}", res.details.mode.as_str());
    println!("  seed: {}", res.result.seed);
    for step in &res.details.steps {
        let kind = match step.kind {
            StepKind::Root => "root",
            StepKind::Backfill => "backfill",
            StepKind::Pinned => "pinned",
            StepKind::Descent => "descent",
        };
        let detail = if step.alternatives > 1 {
            palette.dim(format!("(1 of {})", step.alternatives))
        } else {
            String::new()
        };
        println!("  {:>8}  {} {}", palette.dim(kind), step.tag, detail);
    }
    if !res.details.roots.is_empty() {
        println!("  {}", palette.dim(format!("roots: {:?}", res.details.roots)));
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    let m = &res.details.metrics;
    println!("  parse mapping:   {:?}", m.parse_mapping);
    println!("  parse resources: {:?}", m.parse_resources);
    println!("  walk:            {:?}", m.walk);
    println!("  assemble:        {:?}", m.assemble);
    println!("  total:           {:?}", m.total);

    println!("\n{}", palette.paint("━━━ Outputs ━━━", ansi::GRAY));
    println!("  tags:          {}", palette.paint(&res.result.tags, ansi::GREEN));
    println!("  description_1: {}", res.result.description_1);
    println!("  description_2: {}", res.result.description_2);
    if res.result.attachments.is_empty() {
        println!("  {}", palette.dim("no resource attachments"));
    } else {
        for att in &res.result.attachments {
            let lowmem = if att.low_mem { palette.paint(" [lowmem]", ansi::YELLOW) } else { String::new() };
            let path = att
                .path
                .as_ref()
                .map(|p| palette.dim(format!("  {}", p.display())))
                .unwrap_or_default();
            println!("  {} @ {:.3}{}{}", att.name, att.strength, lowmem, path);
        }
    }
    println!("\n{}", palette.dim("  Tip: Set BRANCHLING_DEBUG_WALK=1 to see every draw"));
}
