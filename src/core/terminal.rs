use console::{Emoji, style};

static OK: Emoji<'_, '_> = Emoji("✅ ", "[ok] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static FAIL: Emoji<'_, '_> = Emoji("❌ ", "[x] ");
static DIAL: Emoji<'_, '_> = Emoji("⚙️  ", "- ");
static DISH: Emoji<'_, '_> = Emoji("📡 ", "");

pub fn print_success(msg: &str) {
    println!("{}{}", OK, style(msg).green());
}

pub fn print_warn(msg: &str) {
    println!("{}{}", WARN, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{}{}", FAIL, style(msg).red().bold());
}

pub fn print_banner() {
    println!(
        "\n{}{}  {}\n",
        DISH,
        style("botdeck").bold().cyan(),
        style("mission control for your bot").dim()
    );
}

/// Titled block of aligned CLI lines, printed in one go.
pub struct GuideSection {
    title: String,
    lines: Vec<String>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, about: &str) -> Self {
        self.lines.push(format!("  {:<10} {}", style(name).green(), about));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.lines
            .push(format!("  {}{}: {}", DIAL, style(label).bold().cyan(), value));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.lines.push(format!("  {text}"));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    pub fn print(self) {
        println!("{}", style(&self.title).bold().underlined());
        for line in &self.lines {
            println!("{line}");
        }
        println!();
    }
}
