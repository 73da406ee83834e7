use anyhow::Result;
use colored::Colorize;

use crate::credentials::FileCredentials;
use crate::ui;

pub fn login(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token cannot be empty");
    }

    let store = FileCredentials::from_home()?;
    store.save(token)?;

    ui::print_success("Token saved");
    ui::print_info(&format!("Stored in {}", store.path().display()));

    Ok(())
}

pub fn logout() -> Result<()> {
    let store = FileCredentials::from_home()?;
    store.delete()?;

    println!("{}", "✓ Logged out successfully".green().bold());
    println!("Your token has been removed from this device.");

    Ok(())
}

pub fn status(json: bool) -> Result<()> {
    let store = FileCredentials::from_home()?;
    let token = store.load()?;

    if json {
        return ui::print_json(&serde_json::json!({
            "authenticated": token.is_some(),
            "credentialsPath": store.path().display().to_string(),
        }));
    }

    match token {
        Some(token) => {
            println!("{}", "OK Authenticated".green().bold());
            println!();
            println!("  Token: {}", mask(&token));
            println!("  Location: {}", store.path().display());
        }
        None => {
            println!("{}", "ERR Not authenticated".red().bold());
            println!();
            println!("Run 'cq auth login --token <TOKEN>' to authenticate.");
        }
    }

    Ok(())
}

/// Shows only the ends of a token.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJh...load");
    }
}
