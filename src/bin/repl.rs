use croupier::{AdvType, MarkdownStringifier, Roller};
use std::io::{self, BufRead, Write};

fn main() -> io::Result<()> {
    let mut roller = Roller::new();
    let stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            match roller.roll_with(line, &mut MarkdownStringifier::new(), true, AdvType::None) {
                Ok(result) => println!("{}", result),
                Err(why) => eprintln!("error: {}", why),
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}
