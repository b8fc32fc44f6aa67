/// Glob matching where `*` matches any sequence of characters (including
/// empty). Every other character matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    // pattern index after the last star, and the text index it was tried at
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            while pi < p.len() && p[pi] == '*' {
                pi += 1;
            }
            if pi == p.len() {
                return true;
            }
            star = Some((pi, ti));
            continue;
        }
        if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
            continue;
        }
        match star {
            Some((spi, sti)) => {
                pi = spi;
                ti = sti + 1;
                star = Some((spi, sti + 1));
            }
            None => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
