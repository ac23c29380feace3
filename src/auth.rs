use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Reads a password the caller supplies directly, for when the configuration
/// provider has none. Returns `None` if nothing was supplied.
pub fn read_password(confirm: bool) -> Result<Option<Zeroizing<String>>> {
    //  stdin (Pipeline)
    //  echo "supersecret" | pbecrypt encrypt "message"
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if buf.is_empty() {
            return Ok(None);
        }
        return Ok(Some(buf));
    }

    //  Interactive (TTY)
    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw.is_empty() {
        bail!("password cannot be empty");
    }

    if confirm {
        let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *pw != *pw2 {
            bail!("passwords do not match");
        }
    }

    Ok(Some(pw))
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
