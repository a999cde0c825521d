pub fn is_numeric_min(min: usize) -> impl Fn(String) -> Result<(), String> {
    move |v: String| {
        let val = v
            .parse::<usize>()
            .map_err(|_| "must be numeric".to_owned())?;

        if val < min {
            return Err(format!("must be >= {}", min));
        }

        Ok(())
    }
}

pub fn is_zoom(v: String) -> Result<(), String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;

    if val > 22 {
        return Err("must be <= 22".to_owned());
    }

    Ok(())
}

pub fn is_image_size(v: String) -> Result<(), String> {
    let val = v.parse::<u16>().map_err(|_| "must be numeric".to_owned())?;

    if val == 0 {
        return Err("must be > 0".to_owned());
    } else if val > 1280 {
        return Err("must be <= 1280".to_owned());
    }

    Ok(())
}
