use kornia_ndarray::{
    ArrayBase, DType, Descriptor, LayoutError, NdArray, Newshape, Order, Reshape,
};
use num_complex::Complex64;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_2x3() -> Result<NdArray, LayoutError> {
    NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
}

#[test]
fn reshape_2x3_to_3x2_in_place() -> Result<(), LayoutError> {
    init_logger();
    let a = sample_2x3()?;
    assert_eq!(a.strides(), vec![24, 8]);
    let ptr = a.as_ptr();

    a.set_shape(&[3, 2], Order::C)?;
    assert_eq!(a.shape(), vec![3, 2]);
    assert_eq!(a.strides(), vec![16, 8]);
    assert_eq!(a.as_ptr(), ptr);
    assert_eq!(a.ref_count(), 1);
    Ok(())
}

#[test]
fn reshape_with_wrong_size_fails() -> Result<(), LayoutError> {
    init_logger();
    let a = sample_2x3()?;
    let err = a.set_shape(&[4, 2], Order::C);
    assert!(matches!(err, Err(LayoutError::IncompatibleLayout(_))));
    assert_eq!(a.shape(), vec![2, 3]);
    assert_eq!(a.strides(), vec![24, 8]);
    Ok(())
}

#[test]
fn complex128_component_views() -> Result<(), LayoutError> {
    init_logger();
    let data: Vec<Complex64> = (0..5).map(|i| Complex64::new(i as f64, 10.0 + i as f64)).collect();
    let z = NdArray::from_shape_vec(&[5], data)?;

    let re = z.get_real()?;
    assert_eq!(re.descriptor().dtype(), DType::Float64);
    assert_eq!(re.shape(), vec![5]);
    assert_eq!(re.strides(), vec![16]);
    assert_eq!(re.data_offset(), 0);

    let im = z.get_imag()?;
    assert_eq!(im.strides(), vec![16]);
    assert_eq!(im.data_offset(), 8);
    assert_eq!(im.get::<f64>(&[4]), Some(14.0));
    Ok(())
}

#[test]
fn views_outlive_their_base_handle() -> Result<(), LayoutError> {
    init_logger();
    let a = sample_2x3()?;
    let column = NdArray::new_view(a.descriptor(), &[2], &[24], &a, 16)?;
    let re = column.get_real()?;
    assert!(NdArray::ptr_eq(&re, &column));
    drop(a);
    assert_eq!(column.to_vec::<f64>(), Some(vec![3.0, 6.0]));
    match column.base() {
        ArrayBase::ViewOf { base, offset } => {
            assert!(base.owns_data());
            assert_eq!(*offset, 16);
        }
        _ => panic!("expected a view"),
    }
    Ok(())
}

#[test]
fn restride_then_reshape() -> Result<(), LayoutError> {
    init_logger();
    let a = NdArray::from_shape_vec(&[2, 3], (0..6).collect::<Vec<i32>>())?;
    // transpose through the strides
    a.set_strides(&[4, 8])?;
    assert!(a.is_f_contiguous() && !a.is_c_contiguous());
    assert_eq!(a.to_vec::<i32>(), Some(vec![0, 2, 4, 1, 3, 5]));

    assert!(a.set_shape(&[6], Order::C).is_err());
    a.set_shape(&[3, 2], Order::Fortran)?;
    assert_eq!(a.strides(), vec![4, 12]);
    assert!(a.is_f_contiguous());
    Ok(())
}

#[test]
fn reshape_collaborator_returns_view() -> Result<(), LayoutError> {
    init_logger();
    let a = sample_2x3()?;
    let r = Newshape.reshape(&a, &[6], Order::C)?;
    assert!(NdArray::ptr_eq(r.root(), &a));
    assert_eq!(a.ref_count(), 2);
    drop(r);
    assert_eq!(a.ref_count(), 1);
    Ok(())
}

#[test]
fn external_buffers_cannot_be_restrided() -> Result<(), LayoutError> {
    init_logger();
    let a = NdArray::from_buffer(
        Descriptor::from_type(DType::Int16),
        &[2, 2],
        None,
        vec![0u8; 8],
    )?;
    let err = a.set_strides(&[2, 4]);
    assert!(matches!(err, Err(LayoutError::InvalidArgument(_))));
    assert_eq!(a.strides(), vec![4, 2]);
    Ok(())
}

#[test]
fn empty_arrays_accept_any_strides() -> Result<(), LayoutError> {
    init_logger();
    let a = NdArray::zeros(Descriptor::from_type(DType::Float32), &[0, 4], Order::C)?;
    a.set_strides(&[1_000, -1_000])?;
    assert!(a.is_c_contiguous() && a.is_f_contiguous());
    a.set_shape(&[4, 0, 2], Order::C)?;
    assert_eq!(a.numel(), 0);
    Ok(())
}
