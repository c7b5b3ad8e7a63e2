use citefield::{CitationStatus, Expansion};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
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

pub fn print_run(input: &str, out: &Expansion, typing: bool, color: bool) {
    let palette = ansi::Palette::new(color);
    let mode = if typing { "Typing" } else { "Expanding" };
    println!("\n{}", palette.bold(palette.paint(format!("⚙  {mode}: \"{}\"", input.trim_end()), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Text ━━━", ansi::GRAY));
    if out.text == input {
        println!("  {}", palette.dim("(unchanged)"));
    }
    for line in out.text.lines() {
        println!("  {line}");
    }

    println!("\n{}", palette.paint("━━━ Citations ━━━", ansi::GRAY));
    if out.citations.is_empty() {
        println!("{}", palette.dim("  No citations detected"));
        println!("\n{}", palette.paint("A citation looks like:", ansi::YELLOW));
        println!("  • Book chapter:verse          John 3:16");
        println!("  • with an ordinal             1 John 4:8, II Kings 2:11");
        println!("  • with a verse range          Romans 8:28-30");
        println!("\n{}", palette.dim("  Tip: Set CITEFIELD_LOG=trace to see every candidate span"));
    } else {
        print_citations(out, &palette);
    }

    println!("\n{}", palette.paint("━━━ Metrics ━━━", ansi::GRAY));
    print_metrics(out, &palette);
    println!();
}

fn print_citations(out: &Expansion, palette: &ansi::Palette) {
    for (idx, citation) in out.citations.iter().enumerate() {
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.bold(&citation.raw_text),
            palette.dim("│"),
            paint_status(citation.status, palette),
        );
        println!("      {} {}", palette.dim("key:"), palette.paint(&citation.normalized_key, ansi::BLUE));
        if let Some(err) = &citation.last_error {
            println!("      {} {}", palette.dim("error:"), palette.paint(err.to_string(), ansi::RED));
        }
    }
}

fn paint_status(status: CitationStatus, palette: &ansi::Palette) -> String {
    let color = match status {
        CitationStatus::Resolved => ansi::GREEN,
        CitationStatus::Failed => ansi::RED,
        CitationStatus::Detected | CitationStatus::Resolving => ansi::YELLOW,
    };
    palette.paint(status.as_str(), color)
}

fn print_metrics(out: &Expansion, palette: &ansi::Palette) {
    let m = &out.metrics;
    println!(
        "  Scans: {} {}  │  Candidates: {}",
        palette.paint(m.scans.to_string(), ansi::BLUE),
        palette.dim(format!("({} skipped)", m.skipped_scans)),
        palette.paint(m.candidates.to_string(), ansi::BLUE),
    );
    println!(
        "  Lookups: {}  │  Resolved: {}  │  Failed: {}  │  Stale: {}",
        palette.paint(m.dispatched.to_string(), ansi::BLUE),
        palette.paint(m.resolved.to_string(), ansi::GREEN),
        if m.failed > 0 { palette.paint(m.failed.to_string(), ansi::RED) } else { palette.dim("0") },
        palette.dim(m.stale.to_string()),
    );
    println!(
        "  Total: {}  │  Scanning: {}",
        palette.paint(format!("{:?}", out.elapsed), ansi::GREEN),
        palette.dim(format!("{:?}", m.scan_time)),
    );
}
